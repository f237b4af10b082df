//! Timed writes and "drain until quiet" reads over a [`Port`].
//!
//! The U-Boot console has no framing: a response is over when the device
//! stops sending. `drain` reads until one poll comes back empty, so the
//! active port timeout is the length of silence that ends a response. The
//! prompt check done by the callers is what confirms the shell is idle.

use {
    crate::{error::Result, port::Port},
    log::{debug, trace},
    std::{io::ErrorKind, thread, time::Duration},
};

/// Read chunk size for a single poll.
const POLL_CHUNK: usize = 4096;

/// Which timeout is currently applied to the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutMode {
    /// Coarse timeout used while discovering the shell.
    Slow,
    /// Tight timeout used while dumping.
    Fast,
}

/// Timeout configuration for a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// Quiet period during the handshake.
    pub slow_timeout: Duration,
    /// Quiet period while polling burst responses.
    pub fast_timeout: Duration,
    /// Pause after opening the port before stale input is discarded.
    pub settle_delay: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            slow_timeout: Duration::from_secs(1),
            fast_timeout: Duration::from_millis(10),
            settle_delay: Duration::from_secs(1),
        }
    }
}

impl TransportSettings {
    /// Settings with no settle delay and short timeouts, for scripted ports.
    pub fn immediate() -> Self {
        Self {
            slow_timeout: Duration::from_millis(1),
            fast_timeout: Duration::from_millis(1),
            settle_delay: Duration::ZERO,
        }
    }

    /// Timeout for the given mode.
    pub fn timeout_for(&self, mode: TimeoutMode) -> Duration {
        match mode {
            TimeoutMode::Slow => self.slow_timeout,
            TimeoutMode::Fast => self.fast_timeout,
        }
    }
}

/// Line-agnostic byte transport on top of a [`Port`].
pub struct TransportPort<P: Port> {
    port: P,
    settings: TransportSettings,
    mode: Option<TimeoutMode>,
}

impl<P: Port> TransportPort<P> {
    /// Wrap an opened port.
    pub fn new(port: P, settings: TransportSettings) -> Self {
        Self {
            port,
            settings,
            mode: None,
        }
    }

    /// Active timeout mode, `None` until [`set_mode`](Self::set_mode) is called.
    pub fn mode(&self) -> Option<TimeoutMode> {
        self.mode
    }

    /// Consume the transport and return the underlying port.
    pub fn into_inner(self) -> P {
        self.port
    }

    /// Release the device. Reads and writes fail afterwards.
    pub fn close(&mut self) -> Result<()> {
        debug!("Closing {}", self.port.name());
        self.mode = None;
        self.port.close()
    }

    /// Switch between the slow and fast timeout regimes.
    ///
    /// A read already in progress is not affected; the new timeout applies
    /// from the next poll on.
    pub fn set_mode(&mut self, mode: TimeoutMode) -> Result<()> {
        if self.mode == Some(mode) {
            return Ok(());
        }
        let timeout = self.settings.timeout_for(mode);
        debug!("Switching {} to {mode:?} timeout ({timeout:?})", self.port.name());
        self.port.set_timeout(timeout)?;
        self.mode = Some(mode);
        Ok(())
    }

    /// Let the line settle, then discard anything the device printed before
    /// we started talking to it.
    pub fn prepare(&mut self) -> Result<()> {
        if !self.settings.settle_delay.is_zero() {
            thread::sleep(self.settings.settle_delay);
        }
        self.port.clear_buffers()
    }

    /// Send raw bytes. There is no acknowledgement.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        trace!("TX {:?}", String::from_utf8_lossy(data));
        self.port.write_all_bytes(data)
    }

    /// Read until one poll returns nothing and hand back everything read.
    ///
    /// The result is empty if the first poll was already quiet.
    pub fn drain(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut buf = [0u8; POLL_CHUNK];

        loop {
            match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => data.extend_from_slice(&buf[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    break;
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => return Err(e.into()),
            }
        }

        if !data.is_empty() {
            trace!("RX {} bytes: {:?}", data.len(), String::from_utf8_lossy(&data));
        }
        Ok(data)
    }

    /// Drain repeatedly until a drain adds nothing.
    pub fn drain_until_quiet(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let chunk = self.drain()?;
            if chunk.is_empty() {
                return Ok(data);
            }
            data.extend_from_slice(&chunk);
        }
    }
}
