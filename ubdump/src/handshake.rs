//! Shell liveness check.
//!
//! Before committing to a long dump we make sure the U-Boot prompt comes
//! back for an empty command. The probe runs with the slow timeout; once the
//! prompt is seen the transport is switched to the fast timeout for the
//! burst traffic that follows.

use {
    crate::{
        error::{Error, Result},
        port::Port,
        shell::{ShellCommand, contains_prompt},
        transport::{TimeoutMode, TransportPort},
    },
    log::{debug, info, warn},
};

/// Number of times the empty command is sent before giving up.
pub const PROBE_ATTEMPTS: usize = 2;

/// Checks that the shell is present and prints the expected prompt.
#[derive(Debug, Clone)]
pub struct HandshakeProbe {
    prompt: String,
    attempts: usize,
}

impl HandshakeProbe {
    /// Create a probe looking for `prompt`.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attempts: PROBE_ATTEMPTS,
        }
    }

    /// Override the number of attempts (at least one is always made).
    #[must_use]
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Prompt this probe waits for.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Probe the shell. On success the transport is left in fast mode.
    pub fn probe<P: Port>(&self, transport: &mut TransportPort<P>) -> Result<()> {
        transport.set_mode(TimeoutMode::Slow)?;

        for attempt in 1..=self.attempts {
            let command = ShellCommand::Nop.build();
            debug!("Executing: {:?}", String::from_utf8_lossy(&command));
            transport.write(&command)?;

            if self.wait_for_prompt(transport)? {
                info!("U-Boot responding");
                transport.set_mode(TimeoutMode::Fast)?;
                return Ok(());
            }

            warn!(
                "No prompt {:?} (attempt {attempt}/{})",
                self.prompt, self.attempts
            );
        }

        Err(Error::NotResponding {
            attempts: self.attempts,
        })
    }

    /// Drain until the prompt shows up or the output stops growing.
    fn wait_for_prompt<P: Port>(&self, transport: &mut TransportPort<P>) -> Result<bool> {
        let mut received = Vec::new();
        loop {
            let chunk = transport.drain()?;
            if chunk.is_empty() {
                return Ok(false);
            }
            received.extend_from_slice(&chunk);
            if contains_prompt(&received, &self.prompt) {
                return Ok(true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{port::mock::MockPort, transport::TransportSettings};

    fn transport(port: MockPort) -> TransportPort<MockPort> {
        TransportPort::new(port, TransportSettings::immediate())
    }

    #[test]
    fn test_prompt_on_first_attempt() {
        let port = MockPort::new().respond(&[b" \r\n", b"U-Boot# "]);
        let log = port.log();
        let mut transport = transport(port);

        HandshakeProbe::new("U-Boot#")
            .probe(&mut transport)
            .unwrap();

        assert_eq!(transport.mode(), Some(TimeoutMode::Fast));
        assert_eq!(log.lock().unwrap().written_text(), vec![" \n"]);
    }

    #[test]
    fn test_prompt_on_second_attempt() {
        let port = MockPort::new()
            .respond(&[])
            .respond(&[b"\r\nU-Boot# "]);
        let log = port.log();
        let mut transport = transport(port);

        HandshakeProbe::new("U-Boot#")
            .probe(&mut transport)
            .unwrap();

        assert_eq!(log.lock().unwrap().writes.len(), 2);
    }

    #[test]
    fn test_prompt_split_across_drains() {
        let port = MockPort::new().respond_script(&[Some("\r\nU-Bo"), None, Some("ot# ")]);
        let mut transport = transport(port);

        assert!(
            HandshakeProbe::new("U-Boot#")
                .probe(&mut transport)
                .is_ok()
        );
    }

    #[test]
    fn test_silence_fails_after_two_attempts() {
        let port = MockPort::new();
        let log = port.log();
        let mut transport = transport(port);

        let err = HandshakeProbe::new("U-Boot#")
            .probe(&mut transport)
            .unwrap_err();

        assert!(matches!(err, Error::NotResponding { attempts: 2 }));
        assert_eq!(log.lock().unwrap().writes.len(), PROBE_ATTEMPTS);
        assert_eq!(transport.mode(), Some(TimeoutMode::Slow));
    }

    #[test]
    fn test_wrong_prompt_fails() {
        let port = MockPort::new()
            .respond(&[b"=> "])
            .respond(&[b"=> "]);
        let mut transport = transport(port);

        let err = HandshakeProbe::new("U-Boot#")
            .probe(&mut transport)
            .unwrap_err();
        assert!(matches!(err, Error::NotResponding { .. }));
    }

    #[test]
    fn test_custom_attempt_count() {
        let port = MockPort::new();
        let log = port.log();
        let mut transport = transport(port);

        let probe = HandshakeProbe::new("=>").with_attempts(0);
        assert!(probe.probe(&mut transport).is_err());
        assert_eq!(log.lock().unwrap().writes.len(), 1);
    }
}
