//! # ubdump
//!
//! A library for dumping device memory through the U-Boot shell.
//!
//! The device is driven over its serial console with ordinary `md.b`
//! commands; the printed hex listing is parsed back into bytes. The crate
//! provides:
//!
//! - A handshake that checks the shell prompt before any dump traffic
//! - A "drain until quiet" transport with separate handshake and dump timeouts
//! - A strict parser for `md.b` lines
//! - A session that checks address continuity across every line and burst
//!
//! There is no checksum on the console, so every anomaly (missing prompt,
//! truncated line, unexpected address, short burst) aborts the dump rather
//! than risk a corrupted image.
//!
//! ## Features
//!
//! - `native` (default): Native serial port support via the `serialport` crate
//! - `serde`: `Serialize` for [`PortInfo`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use ubdump::{DumpRequest, DumpSession, SerialConfig, TransportSettings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = DumpRequest::new(0x8780_0000, 128 * 1024, 1024)?;
//!
//!     #[cfg(feature = "native")]
//!     {
//!         let port = ubdump::NativePort::open(&SerialConfig::new("/dev/ttyACM0"))?;
//!         let mut session = DumpSession::to_file(
//!             port,
//!             request,
//!             TransportSettings::default(),
//!             "U-Boot#",
//!             request.default_output_name(),
//!         )?;
//!
//!         let summary = session.run(|done, total| {
//!             println!("{done}/{total} bytes");
//!         })?;
//!         println!("{:.2} kB/s", summary.rate_kib_per_sec());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod burst;
pub mod error;
pub mod handshake;
pub mod line;
pub mod port;
pub mod request;
pub mod session;
pub mod shell;
pub mod sink;
pub mod transport;

// Re-exports for convenience
#[cfg(feature = "native")]
pub use port::{NativePort, NativePortEnumerator};
pub use {
    burst::BurstCycle,
    error::{Error, ErrorCategory, Result},
    handshake::{HandshakeProbe, PROBE_ATTEMPTS},
    line::{LineParser, ParsedLine},
    port::{DEFAULT_BAUD, Port, PortEnumerator, PortInfo, SerialConfig},
    request::{
        DEFAULT_BURST_SIZE, DEFAULT_LINE_WIDTH, DEFAULT_TOTAL_BYTES, DumpRequest,
        default_output_name,
    },
    session::{DumpSession, DumpSummary, SessionPhase, SessionState},
    shell::{DEFAULT_PROMPT, ShellCommand},
    sink::{DumpSink, FileSink},
    transport::{TimeoutMode, TransportPort, TransportSettings},
};
