//! Parser for `md.b` output lines.
//!
//! A data line looks like
//!
//! ```text
//! 1000beef: 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f 10    ................
//! ```
//!
//! Only the address token and the first `line_width` byte tokens are used;
//! the ASCII column is ignored. Lines without a `:` are shell noise (echoed
//! commands, blank separators, the prompt) and are skipped, unless they are
//! shaped like a data line that lost its delimiter (`1000beef 01 02 ...`).

use crate::error::{Error, Result};

/// Address delimiter that marks a data line.
const ADDRESS_DELIMITER: u8 = b':';

/// `md.b` zero-pads addresses to at least this many digits.
const ADDRESS_DIGITS: usize = 8;

/// One decoded dump line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Address of the first byte on the line.
    pub address: u32,
    /// Bytes in printed (ascending address) order.
    pub bytes: Vec<u8>,
}

/// Converts a single text line into a [`ParsedLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineParser {
    width: usize,
}

impl LineParser {
    /// Create a parser for lines carrying `width` bytes.
    pub fn new(width: u32) -> Self {
        Self {
            width: width as usize,
        }
    }

    /// Bytes expected per line.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Parse one line.
    ///
    /// Returns `Ok(None)` for lines that carry no data and an
    /// [`Error::InvalidLine`] for data lines that are malformed or truncated.
    pub fn parse(&self, line: &[u8]) -> Result<Option<ParsedLine>> {
        if line.is_empty() {
            return Ok(None);
        }
        if !line.contains(&ADDRESS_DELIMITER) {
            if looks_like_data(line) {
                return Err(Error::invalid_line(line, "address token has no ':'"));
            }
            return Ok(None);
        }

        let mut tokens = line
            .split(u8::is_ascii_whitespace)
            .filter(|t| !t.is_empty());

        let address_token = tokens
            .next()
            .ok_or_else(|| Error::invalid_line(line, "no tokens"))?;
        let address_digits = address_token
            .strip_suffix(&[ADDRESS_DELIMITER])
            .ok_or_else(|| Error::invalid_line(line, "first token does not end with ':'"))?;
        let address = parse_hex(address_digits)
            .and_then(|s| u32::from_str_radix(s, 16).ok())
            .ok_or_else(|| Error::invalid_line(line, "bad address"))?;

        let mut bytes = Vec::with_capacity(self.width);
        for index in 0..self.width {
            let token = tokens.next().ok_or_else(|| {
                Error::invalid_line(line, format!("only {index} of {} bytes", self.width))
            })?;
            let byte = parse_hex(token)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| Error::invalid_line(line, format!("bad byte at position {index}")))?;
            bytes.push(byte);
        }

        Ok(Some(ParsedLine { address, bytes }))
    }
}

/// A full-width hex address followed by a hex byte, as in a data line whose
/// ':' was lost on the wire.
fn looks_like_data(line: &[u8]) -> bool {
    let mut tokens = line
        .split(u8::is_ascii_whitespace)
        .filter(|t| !t.is_empty());
    let (Some(address), Some(first_byte)) = (tokens.next(), tokens.next()) else {
        return false;
    };
    address.len() >= ADDRESS_DIGITS
        && parse_hex(address).is_some()
        && first_byte.len() <= 2
        && parse_hex(first_byte).is_some()
}

/// Borrow a token as text if it is made of hex digits only.
///
/// `from_str_radix` also accepts a leading `+`, which never appears in a
/// dump and would hide corruption.
fn parse_hex(token: &[u8]) -> Option<&str> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    std::str::from_utf8(token).ok()
}
