//! Error types for ubdump.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ubdump operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ubdump operations.
///
/// Every error is fatal to a dump session. [`Error::category`] groups the
/// variants by the stage at which they are detected.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Invalid dump parameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The output file already exists and will not be overwritten.
    #[error("Output file {} already exists, won't overwrite", .0.display())]
    OutputExists(PathBuf),

    /// The shell never printed its prompt during the handshake.
    #[error("U-Boot not responding (no prompt after {attempts} attempts)")]
    NotResponding {
        /// Number of probe attempts made.
        attempts: usize,
    },

    /// A response line could not be parsed.
    #[error("Invalid line structure, probably an I/O error: {reason} in {line:?}")]
    InvalidLine {
        /// The offending line, lossily decoded.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A burst response did not end with the shell prompt.
    #[error("U-Boot not responding correctly (last line {last_line:?} has no prompt)")]
    MissingPrompt {
        /// The last line received, lossily decoded.
        last_line: String,
    },

    /// A burst produced a different number of bytes than requested.
    #[error("Burst at 0x{address:08X} produced {actual} bytes, expected {expected}")]
    ByteCount {
        /// Address the burst was requested at.
        address: u32,
        /// Bytes requested.
        expected: u64,
        /// Bytes actually parsed.
        actual: u64,
    },

    /// A parsed line address does not follow the previous one.
    #[error(
        "Current address 0x{expected:08X} != line address 0x{actual:08X}, probably an I/O error"
    )]
    Continuity {
        /// Address the session expected next.
        expected: u32,
        /// Address printed on the line.
        actual: u32,
    },
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Detected before any device traffic (bad parameters, existing output).
    Precondition,
    /// The shell did not answer the handshake.
    Liveness,
    /// Garbled or truncated response text.
    Structural,
    /// Parsed address did not match the expected one.
    Continuity,
    /// Underlying port or file failure.
    Io,
}

impl Error {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::OutputExists(_) => ErrorCategory::Precondition,
            Self::NotResponding { .. } => ErrorCategory::Liveness,
            Self::InvalidLine { .. } | Self::MissingPrompt { .. } | Self::ByteCount { .. } => {
                ErrorCategory::Structural
            },
            Self::Continuity { .. } => ErrorCategory::Continuity,
            Self::Io(_) => ErrorCategory::Io,
            #[cfg(feature = "native")]
            Self::Serial(_) => ErrorCategory::Io,
        }
    }

    pub(crate) fn invalid_line(line: &[u8], reason: impl Into<String>) -> Self {
        Self::InvalidLine {
            line: String::from_utf8_lossy(line).into_owned(),
            reason: reason.into(),
        }
    }
}
