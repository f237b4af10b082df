//! One `md.b` request/response round-trip.

use {
    crate::{
        error::{Error, Result},
        line::{LineParser, ParsedLine},
        port::Port,
        shell::{ShellCommand, contains_prompt, split_lines},
        transport::TransportPort,
    },
    log::{debug, trace},
};

/// A single dump command covering `length` bytes from `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstCycle {
    address: u32,
    length: u32,
}

impl BurstCycle {
    /// Create a burst for `length` bytes starting at `address`.
    pub fn new(address: u32, length: u32) -> Self {
        Self { address, length }
    }

    /// Start address.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Requested byte count.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Send the command, collect the response and parse its data lines.
    ///
    /// The transport must already be in fast mode. The response is complete
    /// once a drain returns nothing; its last line must carry the prompt.
    /// Lines are returned in received order, without any address checks.
    pub fn run<P: Port>(
        &self,
        transport: &mut TransportPort<P>,
        prompt: &str,
        parser: &LineParser,
    ) -> Result<Vec<ParsedLine>> {
        let command = ShellCommand::MemoryDisplay {
            address: self.address,
            count: self.length,
        }
        .build();
        debug!("Executing: {:?}", String::from_utf8_lossy(&command));
        transport.write(&command)?;

        let response = transport.drain_until_quiet()?;
        let lines = split_lines(&response);

        let Some((last, body)) = lines.split_last() else {
            return Err(Error::MissingPrompt {
                last_line: String::new(),
            });
        };
        if !contains_prompt(last, prompt) {
            return Err(Error::MissingPrompt {
                last_line: String::from_utf8_lossy(last).into_owned(),
            });
        }

        let mut parsed = Vec::with_capacity(self.length as usize / parser.width().max(1));
        for line in body {
            match parser.parse(line)? {
                Some(data) => {
                    trace!("Line address: {:08x}", data.address);
                    parsed.push(data);
                },
                None => trace!("Skipping {:?}", String::from_utf8_lossy(line)),
            }
        }

        Ok(parsed)
    }
}
