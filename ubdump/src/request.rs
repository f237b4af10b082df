//! Validated dump parameters.

use crate::error::{Error, Result};

/// Bytes printed per `md.b` line.
pub const DEFAULT_LINE_WIDTH: u32 = 16;

/// Bytes dumped when no size is given (128 KiB).
pub const DEFAULT_TOTAL_BYTES: u64 = 128 * 1024;

/// Bytes requested per `md.b` command.
pub const DEFAULT_BURST_SIZE: u32 = 1024;

/// Size of the 32-bit address space.
const ADDRESS_SPACE: u64 = 1 << 32;

/// What to dump and in which chunks.
///
/// Always satisfies `burst_size % line_width == 0` and
/// `total_bytes % burst_size == 0`, and the whole range fits below 4 GiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpRequest {
    start_address: u32,
    total_bytes: u64,
    burst_size: u32,
    line_width: u32,
}

impl DumpRequest {
    /// Create a request with the standard 16-byte line width.
    pub fn new(start_address: u32, total_bytes: u64, burst_size: u32) -> Result<Self> {
        Self::with_line_width(start_address, total_bytes, burst_size, DEFAULT_LINE_WIDTH)
    }

    /// Create a request for a shell printing `line_width` bytes per line.
    pub fn with_line_width(
        start_address: u32,
        total_bytes: u64,
        burst_size: u32,
        line_width: u32,
    ) -> Result<Self> {
        if line_width == 0 {
            return Err(Error::Config("Line width must not be zero".into()));
        }
        if burst_size == 0 {
            return Err(Error::Config("Burst size must not be zero".into()));
        }
        if total_bytes == 0 {
            return Err(Error::Config("Dump size must not be zero".into()));
        }
        if burst_size % line_width != 0 {
            return Err(Error::Config(format!(
                "Burst size ({burst_size}) isn't a multiple of {line_width}"
            )));
        }
        if total_bytes % u64::from(burst_size) != 0 {
            return Err(Error::Config(format!(
                "Dump size ({total_bytes}) isn't a multiple of burst size ({burst_size})"
            )));
        }
        if u64::from(start_address) + total_bytes > ADDRESS_SPACE {
            return Err(Error::Config(format!(
                "Dumping {total_bytes} bytes from 0x{start_address:08X} runs past the end of the address space"
            )));
        }

        Ok(Self {
            start_address,
            total_bytes,
            burst_size,
            line_width,
        })
    }

    /// First address to dump.
    pub fn start_address(&self) -> u32 {
        self.start_address
    }

    /// Total number of bytes to dump.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Bytes per `md.b` command.
    pub fn burst_size(&self) -> u32 {
        self.burst_size
    }

    /// Bytes per printed line.
    pub fn line_width(&self) -> u32 {
        self.line_width
    }

    /// Number of bursts needed to cover the request.
    pub fn burst_count(&self) -> u64 {
        self.total_bytes / u64::from(self.burst_size)
    }

    /// Output file name used when none is given, e.g. `dump-0x87800000.bin`.
    pub fn default_output_name(&self) -> String {
        default_output_name(self.start_address)
    }
}

/// Output file name for a dump starting at `start_address`.
pub fn default_output_name(start_address: u32) -> String {
    format!("dump-0x{start_address:08X}.bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let req = DumpRequest::new(0x8780_0000, DEFAULT_TOTAL_BYTES, DEFAULT_BURST_SIZE).unwrap();
        assert_eq!(req.line_width(), 16);
        assert_eq!(req.burst_count(), 128);
    }

    #[test]
    fn test_burst_not_multiple_of_line_width_rejected() {
        let err = DumpRequest::new(0x1000, 2000, 1000).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("multiple of 16"));
    }

    #[test]
    fn test_total_not_multiple_of_burst_rejected() {
        let err = DumpRequest::new(0x1000, 1536, 1024).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(DumpRequest::new(0, 0, 1024).is_err());
        assert!(DumpRequest::new(0, 1024, 0).is_err());
        assert!(DumpRequest::with_line_width(0, 1024, 1024, 0).is_err());
    }

    #[test]
    fn test_custom_line_width() {
        let req = DumpRequest::with_line_width(0, 64, 32, 8).unwrap();
        assert_eq!(req.line_width(), 8);
        assert!(DumpRequest::with_line_width(0, 64, 36, 8).is_err());
    }

    #[test]
    fn test_range_must_fit_address_space() {
        assert!(DumpRequest::new(0xFFFF_FC00, 1024, 1024).is_ok());
        assert!(DumpRequest::new(0xFFFF_FC00, 2048, 1024).is_err());
    }

    #[test]
    fn test_default_output_name() {
        let req = DumpRequest::new(0xDEADBEEF & !0xF, 1024, 1024).unwrap();
        assert_eq!(req.default_output_name(), "dump-0xDEADBEE0.bin");
        assert_eq!(default_output_name(0x1000), "dump-0x00001000.bin");
    }
}
