//! Port abstraction for serial communication.
//!
//! The protocol engine only needs a byte stream with an adjustable read
//! timeout, so it is written against the `Port` trait rather than a concrete
//! serial implementation:
//!
//! ```text
//! +--------------------------------+
//! |  DumpSession / BurstCycle /    |
//! |  HandshakeProbe                |
//! +---------------+----------------+
//!                 |
//!                 v
//! +---------------+----------------+
//! |  TransportPort (drain, modes)  |
//! +---------------+----------------+
//!                 |
//!                 v
//! +---------------+----------------+
//! |  Port trait                    |
//! +---------------+----------------+
//!                 |
//!                 v
//! +---------------+----------------+
//! |  NativePort (serialport)       |
//! +--------------------------------+
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ubdump::port::Port;
//!
//! fn poke_shell<P: Port>(port: &mut P) -> ubdump::Result<usize> {
//!     port.set_timeout(Duration::from_millis(100))?;
//!     port.write_all_bytes(b" \n")?;
//!
//!     let mut reply = [0u8; 64];
//!     Ok(port.read(&mut reply)?)
//! }
//! ```

#[cfg(feature = "native")]
pub mod native;

#[cfg(test)]
pub(crate) mod mock;

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// Baud rate the U-Boot console runs at.
pub const DEFAULT_BAUD: u32 = 115200;

/// How to open the console port.
///
/// Framing is always 8N1 without flow control; U-Boot consoles offer
/// nothing else.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path such as `/dev/ttyACM0` or `COM3`.
    pub port_name: String,
    /// Line speed, 115200 unless the board was reconfigured.
    pub baud_rate: u32,
    /// Read timeout applied right after opening.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD,
            timeout: Duration::from_secs(1),
        }
    }
}

impl SerialConfig {
    /// Console on `port_name` at [`DEFAULT_BAUD`].
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Default::default()
        }
    }

    /// Override the line speed.
    #[must_use]
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the initial read timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A serial device found on the host.
///
/// USB descriptors are only known for USB adapters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PortInfo {
    /// Device path.
    pub name: String,
    /// USB vendor ID.
    pub vid: Option<u16>,
    /// USB product ID.
    pub pid: Option<u16>,
    /// USB manufacturer string.
    pub manufacturer: Option<String>,
    /// USB product string.
    pub product: Option<String>,
    /// USB serial number.
    #[cfg_attr(feature = "serde", serde(rename = "serial"))]
    pub serial_number: Option<String>,
}

/// Byte stream to the console with a settable read timeout.
///
/// A read that finds no data within the timeout either returns `Ok(0)` or
/// fails with `ErrorKind::TimedOut`; both mean the link was quiet.
pub trait Port: Read + Write + Send {
    /// Change how long a read waits for the first byte.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Drop anything buffered in either direction.
    fn clear_buffers(&mut self) -> Result<()>;

    /// Device path, for messages.
    fn name(&self) -> &str;

    /// Release the device. Further I/O fails.
    fn close(&mut self) -> Result<()>;

    /// Write and flush `buf`.
    fn write_all_bytes(&mut self, buf: &[u8]) -> Result<()> {
        std::io::Write::write_all(self, buf)?;
        std::io::Write::flush(self)?;
        Ok(())
    }
}

/// Discovery of serial devices, independent of any open [`Port`].
pub trait PortEnumerator {
    /// Every serial device on the host.
    fn list_ports() -> Result<Vec<PortInfo>>;

    /// Devices behind a USB adapter with the given vendor and product ID.
    fn find_by_vid_pid(vid: u16, pid: u16) -> Result<Vec<PortInfo>> {
        let ports = Self::list_ports()?;
        Ok(ports
            .into_iter()
            .filter(|p| p.vid == Some(vid) && p.pid == Some(pid))
            .collect())
    }
}

#[cfg(feature = "native")]
pub use native::{NativePort, NativePortEnumerator};
