//! Dump session orchestration.
//!
//! ```text
//!  Idle --> Handshaking --> Cycling --(bytes_written == total)--> Done
//!               |              | ^
//!               |              +-+ one BurstCycle per iteration
//!               v              v
//!             Failed <---------+
//! ```
//!
//! Every error is terminal. Each burst is requested at the session's current
//! address, so a line printed at any other address means a burst was
//! dropped, duplicated or misparsed, and the dump stops before the output
//! can drift.

use {
    crate::{
        burst::BurstCycle,
        error::{Error, Result},
        handshake::HandshakeProbe,
        line::{LineParser, ParsedLine},
        port::Port,
        request::DumpRequest,
        shell::validate_prompt,
        sink::{DumpSink, FileSink},
        transport::{TransportPort, TransportSettings},
    },
    log::{debug, info, warn},
    std::{
        path::PathBuf,
        time::{Duration, Instant},
    },
};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not started yet.
    Idle,
    /// Waiting for the shell prompt.
    Handshaking,
    /// Issuing bursts.
    Cycling,
    /// All requested bytes written.
    Done,
    /// Stopped on an error.
    Failed,
}

/// Mutable progress of a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionState {
    /// Address the next parsed line must carry.
    pub current_address: u32,
    /// Bytes handed to the sink so far.
    pub bytes_written: u64,
    /// When dumping started.
    pub started: Instant,
}

impl SessionState {
    fn new(start_address: u32) -> Self {
        Self {
            current_address: start_address,
            bytes_written: 0,
            started: Instant::now(),
        }
    }

    /// Check that `line` continues the dump and advance past it.
    fn accept(&mut self, line: &ParsedLine) -> Result<()> {
        if line.address != self.current_address {
            return Err(Error::Continuity {
                expected: self.current_address,
                actual: line.address,
            });
        }
        // Wraps to 0 only after the very last line of a dump ending at 4 GiB
        #[allow(clippy::cast_possible_truncation)]
        let width = line.bytes.len() as u32;
        self.current_address = self.current_address.wrapping_add(width);
        Ok(())
    }
}

/// Outcome of a completed dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    /// First dumped address.
    pub start_address: u32,
    /// Bytes written.
    pub bytes: u64,
    /// Time spent dumping, handshake excluded.
    pub elapsed: Duration,
}

impl DumpSummary {
    /// Throughput in bytes per second.
    #[allow(clippy::cast_precision_loss)]
    pub fn rate_bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }

    /// Throughput in KiB per second.
    pub fn rate_kib_per_sec(&self) -> f64 {
        self.rate_bytes_per_sec() / 1024.0
    }
}

/// Drives the handshake and the burst loop for one [`DumpRequest`].
///
/// Owns the transport and the sink. The port is closed once [`run`](Self::run)
/// returns, and the sink is released when the session is dropped.
pub struct DumpSession<P: Port, S: DumpSink> {
    transport: TransportPort<P>,
    sink: S,
    request: DumpRequest,
    probe: HandshakeProbe,
    parser: LineParser,
    phase: SessionPhase,
    state: SessionState,
}

impl<P: Port> DumpSession<P, FileSink> {
    /// Create a session writing to a new file at `path`.
    ///
    /// Fails with [`Error::OutputExists`] before touching the port if the
    /// file is already there.
    pub fn to_file(
        port: P,
        request: DumpRequest,
        settings: TransportSettings,
        prompt: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let prompt = prompt.into();
        validate_prompt(&prompt)?;
        let sink = FileSink::new(path)?;
        Self::new(port, request, settings, prompt, sink)
    }
}

impl<P: Port, S: DumpSink> DumpSession<P, S> {
    /// Create a session over an opened port.
    ///
    /// A blank prompt is rejected with [`Error::Config`]; nothing is sent.
    pub fn new(
        port: P,
        request: DumpRequest,
        settings: TransportSettings,
        prompt: impl Into<String>,
        sink: S,
    ) -> Result<Self> {
        let prompt = prompt.into();
        validate_prompt(&prompt)?;
        Ok(Self {
            transport: TransportPort::new(port, settings),
            sink,
            request,
            probe: HandshakeProbe::new(prompt),
            parser: LineParser::new(request.line_width()),
            phase: SessionPhase::Idle,
            state: SessionState::new(request.start_address()),
        })
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current progress.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The request being served.
    pub fn request(&self) -> &DumpRequest {
        &self.request
    }

    /// The output sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the session and return the port and the sink.
    pub fn into_parts(self) -> (P, S) {
        (self.transport.into_inner(), self.sink)
    }

    /// Run the dump to completion.
    ///
    /// `progress` is called after every burst with the bytes written so far
    /// and the total. A session runs at most once; the port is closed when
    /// it returns.
    pub fn run<F>(&mut self, mut progress: F) -> Result<DumpSummary>
    where
        F: FnMut(u64, u64),
    {
        if self.phase != SessionPhase::Idle {
            return Err(Error::Config(format!(
                "Session already finished ({:?})",
                self.phase
            )));
        }

        let outcome = self.drive(&mut progress);
        if let Err(e) = self.transport.close() {
            warn!("Failed to close port: {e}");
        }

        match outcome {
            Ok(summary) => {
                self.phase = SessionPhase::Done;
                Ok(summary)
            },
            Err(e) => {
                warn!(
                    "Dump failed at 0x{:08X} after {} bytes: {e}",
                    self.state.current_address, self.state.bytes_written
                );
                self.phase = SessionPhase::Failed;
                Err(e)
            },
        }
    }

    fn drive(&mut self, progress: &mut dyn FnMut(u64, u64)) -> Result<DumpSummary> {
        self.phase = SessionPhase::Handshaking;
        self.transport.prepare()?;
        self.probe.probe(&mut self.transport)?;

        self.sink.open()?;
        self.phase = SessionPhase::Cycling;

        let total = self.request.total_bytes();
        let burst_size = self.request.burst_size();
        info!("Start address: 0x{:08X}", self.request.start_address());
        info!("Count: {total} bytes");

        self.state = SessionState::new(self.request.start_address());
        while self.state.bytes_written < total {
            let burst = BurstCycle::new(self.state.current_address, burst_size);
            let lines = burst.run(&mut self.transport, self.probe.prompt(), &self.parser)?;

            let mut data = Vec::with_capacity(burst_size as usize);
            for line in &lines {
                self.state.accept(line)?;
                data.extend_from_slice(&line.bytes);
            }
            if data.len() as u64 != u64::from(burst_size) {
                return Err(Error::ByteCount {
                    address: burst.address(),
                    expected: u64::from(burst_size),
                    actual: data.len() as u64,
                });
            }

            self.sink.write_burst(&data)?;
            self.state.bytes_written += data.len() as u64;
            debug!("Finished: {} bytes", self.state.bytes_written);
            progress(self.state.bytes_written, total);
        }

        self.sink.finish()?;

        let summary = DumpSummary {
            start_address: self.request.start_address(),
            bytes: self.state.bytes_written,
            elapsed: self.state.started.elapsed(),
        };
        info!(
            "Done: {} bytes in {:.2?} ({:.2} kB/s)",
            summary.bytes,
            summary.elapsed,
            summary.rate_kib_per_sec()
        );
        Ok(summary)
    }
}
