//! U-Boot shell wire format.
//!
//! The shell is driven with plain ASCII command lines:
//!
//! ```text
//! probe:  " \n"                        (empty command, just reprints the prompt)
//! dump:   "md.b 0x87800000 0x00000400\n"
//! ```
//!
//! and answers with the echoed command, the `md.b` listing and a fresh
//! prompt:
//!
//! ```text
//! U-Boot# md.b 0x87800000 0x00000400
//! 87800000: 27 05 19 56 5a 1e 3c 9b 5c 41 1f 0a 00 00 00 00    '..VZ.<.\A......
//! ...
//! U-Boot#
//! ```

use crate::error::{Error, Result};

/// Prompt printed by a stock U-Boot shell.
pub const DEFAULT_PROMPT: &str = "U-Boot#";

/// Byte-wise memory display command. Only the byte variant prints one hex
/// token per byte, which is what the line parser expects.
pub const MEMORY_DISPLAY: &str = "md.b";

/// A command sent to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    /// Command with no side effect, used to check that the shell is alive.
    Nop,
    /// Print `count` bytes starting at `address`.
    MemoryDisplay {
        /// Start address.
        address: u32,
        /// Number of bytes.
        count: u32,
    },
}

impl ShellCommand {
    /// Build the command line, including the trailing newline.
    pub fn build(&self) -> Vec<u8> {
        match self {
            Self::Nop => b" \n".to_vec(),
            Self::MemoryDisplay { address, count } => {
                format!("{MEMORY_DISPLAY} 0x{address:08X} 0x{count:08X}\n").into_bytes()
            },
        }
    }
}

/// Reject prompts that would match any output.
pub fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(Error::Config("Prompt must not be empty".into()));
    }
    Ok(())
}

/// Check whether `data` contains the prompt string.
///
/// An empty prompt never matches.
pub fn contains_prompt(data: &[u8], prompt: &str) -> bool {
    let prompt = prompt.as_bytes();
    !prompt.is_empty() && data.windows(prompt.len()).any(|w| w == prompt)
}

/// Split a raw response into lines on `\n`, `\r\n` or a lone `\r`.
///
/// Empty lines are dropped.
pub fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    data.split(|&b| b == b'\n' || b == b'\r')
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nop_command() {
        assert_eq!(ShellCommand::Nop.build(), b" \n");
    }

    #[test]
    fn test_memory_display_command() {
        let cmd = ShellCommand::MemoryDisplay {
            address: 0xDEADBEEF,
            count: 1024,
        };
        assert_eq!(cmd.build(), b"md.b 0xDEADBEEF 0x00000400\n");

        let cmd = ShellCommand::MemoryDisplay {
            address: 0x1000,
            count: 0x20,
        };
        assert_eq!(cmd.build(), b"md.b 0x00001000 0x00000020\n");
    }

    #[test]
    fn test_contains_prompt() {
        assert!(contains_prompt(b"\r\nU-Boot# ", "U-Boot#"));
        assert!(contains_prompt(b"U-Boot#", "U-Boot#"));
        assert!(!contains_prompt(b"U-Boo", "U-Boot#"));
        assert!(!contains_prompt(b"", "U-Boot#"));
        assert!(contains_prompt(b"=> ", "=>"));
        assert!(!contains_prompt(b"garbage\r\n", ""));
    }

    #[test]
    fn test_blank_prompt_rejected() {
        assert!(matches!(validate_prompt(""), Err(Error::Config(_))));
        assert!(matches!(validate_prompt("  \t"), Err(Error::Config(_))));
        assert!(validate_prompt("=>").is_ok());
        assert!(validate_prompt(DEFAULT_PROMPT).is_ok());
    }

    #[test]
    fn test_split_lines_handles_all_terminators() {
        let data = b"md.b 0x0 0x10\r\n00000000: 01\r\n\r\nU-Boot# ";
        let lines = split_lines(data);
        assert_eq!(
            lines,
            vec![
                &b"md.b 0x0 0x10"[..],
                &b"00000000: 01"[..],
                &b"U-Boot# "[..],
            ]
        );

        assert_eq!(split_lines(b"a\rb\nc"), vec![&b"a"[..], &b"b"[..], &b"c"[..]]);
        assert!(split_lines(b"\r\n\r\n").is_empty());
    }
}
