//! Scripted in-memory port for protocol tests.

use {
    crate::{error::Result, port::Port},
    std::{
        collections::VecDeque,
        io::{ErrorKind, Read, Write},
        sync::{Arc, Mutex},
        time::Duration,
    },
};

/// What happened on a [`MockPort`], shared so tests can inspect it after the
/// port has been moved into a session.
#[derive(Debug, Default)]
pub(crate) struct MockLog {
    pub writes: Vec<Vec<u8>>,
    pub timeouts: Vec<Duration>,
    pub clears: usize,
    pub closed: bool,
}

impl MockLog {
    pub fn written_text(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }
}

/// Outcome of one `read` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Poll {
    /// Bytes handed out (split across reads if the buffer is smaller).
    Data(Vec<u8>),
    /// `Ok(0)`.
    Empty,
    /// `Err` of the given kind.
    Fail(ErrorKind),
}

/// Each `write` releases the next scripted response into the read queue.
///
/// A response is a list of polls. Once the queue is empty every read times
/// out.
pub(crate) struct MockPort {
    responses: VecDeque<Vec<Poll>>,
    pending: VecDeque<Poll>,
    log: Arc<Mutex<MockLog>>,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            pending: VecDeque::new(),
            log: Arc::default(),
        }
    }

    /// Queue a response delivered in one burst of reads.
    pub fn respond(self, chunks: &[&[u8]]) -> Self {
        self.respond_polls(chunks.iter().map(|c| Poll::Data(c.to_vec())).collect())
    }

    /// Queue a response where `None` is one timed out poll.
    pub fn respond_script(self, script: &[Option<&str>]) -> Self {
        self.respond_polls(
            script
                .iter()
                .map(|c| match c {
                    Some(text) => Poll::Data(text.as_bytes().to_vec()),
                    None => Poll::Fail(ErrorKind::TimedOut),
                })
                .collect(),
        )
    }

    /// Queue a response made of arbitrary read outcomes.
    pub fn respond_polls(mut self, polls: Vec<Poll>) -> Self {
        self.responses.push_back(polls);
        self
    }

    /// Bytes already waiting before the first write (stale console output).
    pub fn with_stale(mut self, bytes: &[u8]) -> Self {
        self.pending.push_back(Poll::Data(bytes.to_vec()));
        self
    }

    pub fn log(&self) -> Arc<Mutex<MockLog>> {
        Arc::clone(&self.log)
    }
}

impl Port for MockPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.log.lock().unwrap().timeouts.push(timeout);
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.pending.clear();
        self.log.lock().unwrap().clears += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn close(&mut self) -> Result<()> {
        self.pending.clear();
        self.responses.clear();
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.pending.pop_front() {
            Some(Poll::Data(mut chunk)) => {
                let n = buf.len().min(chunk.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    chunk.drain(..n);
                    self.pending.push_front(Poll::Data(chunk));
                }
                Ok(n)
            },
            Some(Poll::Empty) => Ok(0),
            Some(Poll::Fail(kind)) => Err(std::io::Error::new(kind, "scripted failure")),
            None => Err(std::io::Error::new(ErrorKind::TimedOut, "no data")),
        }
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.log.lock().unwrap().writes.push(buf.to_vec());
        if let Some(response) = self.responses.pop_front() {
            self.pending.extend(response);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
