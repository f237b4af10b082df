//! Destinations for validated dump bytes.

use {
    crate::error::{Error, Result},
    log::debug,
    std::{
        fs::{File, OpenOptions},
        io::{BufWriter, ErrorKind, Write},
        path::PathBuf,
    },
};

/// Receives dump bytes in address order.
///
/// `open` is called once the shell has answered the handshake,
/// `write_burst` once per validated burst and `finish` after the last burst.
pub trait DumpSink {
    /// Prepare the sink for writing.
    fn open(&mut self) -> Result<()>;

    /// Append one burst worth of bytes.
    fn write_burst(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush everything written so far.
    fn finish(&mut self) -> Result<()>;
}

impl DumpSink for Vec<u8> {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_burst(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Newly created binary output file. Existing files are never overwritten.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Reserve `path` for output, failing if something is already there.
    ///
    /// Nothing is created until [`DumpSink::open`].
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            return Err(Error::OutputExists(path));
        }
        Ok(Self { path, writer: None })
    }

    /// Whether the file has been created.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| Error::Io(std::io::Error::new(ErrorKind::NotConnected, "output not open")))
    }
}

impl DumpSink for FileSink {
    fn open(&mut self) -> Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        // create_new re-checks existence atomically
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::OutputExists(self.path.clone()),
                _ => Error::Io(e),
            })?;
        debug!("Created {}", self.path.display());
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn write_burst(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer()?.write_all(bytes)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer()?.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_existing_file_rejected_up_front() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.bin");
        std::fs::write(&path, b"old").unwrap();

        let err = FileSink::new(&path).unwrap_err();
        assert!(matches!(err, Error::OutputExists(p) if p == path));
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
    }

    #[test]
    fn test_file_created_only_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.bin");

        let mut sink = FileSink::new(&path).unwrap();
        assert!(!path.exists());
        assert!(!sink.is_open());

        sink.open().unwrap();
        sink.write_burst(&[1, 2, 3]).unwrap();
        sink.write_burst(&[4]).unwrap();
        sink.finish().unwrap();
        drop(sink);

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_file_appearing_before_open_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.bin");

        let mut sink = FileSink::new(&path).unwrap();
        std::fs::write(&path, b"raced").unwrap();

        assert!(matches!(sink.open(), Err(Error::OutputExists(_))));
        assert_eq!(std::fs::read(&path).unwrap(), b"raced");
    }

    #[test]
    fn test_write_before_open_fails() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new(dir.path().join("dump.bin")).unwrap();
        assert!(sink.write_burst(&[0]).is_err());
    }

    #[test]
    fn test_vec_sink_collects_bytes() {
        let mut sink: Vec<u8> = Vec::new();
        sink.open().unwrap();
        sink.write_burst(b"ab").unwrap();
        sink.write_burst(b"cd").unwrap();
        sink.finish().unwrap();
        assert_eq!(sink, b"abcd");
    }
}
