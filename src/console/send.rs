//! The `send` command: hex tokens in, MIDI bytes out.
//!
//! ```text
//! > send 90 40 7f
//! ```
//! Each token is one byte in base 16. Between 1 and 255 tokens are
//! accepted; anything else prints the usage line and sends nothing.

use core::fmt::Write;

use crate::config::MAX_SEND_BYTES;
use crate::console::command::Args;
use heapless::Vec;

pub const SEND_NAME: &str = "send";
pub const SEND_HELP: &str = "Send the space-separated HEX digits as MIDI message";
pub const SEND_USAGE: &str = "usage: send <space-separated list of up to 255 MIDI Hex digits>";

/// Receiver of the bytes parsed by `send`.
pub trait SendSink {
    fn send(&mut self, bytes: &[u8], out: &mut dyn Write);
}

impl<F> SendSink for F
where
    F: FnMut(&[u8], &mut dyn Write),
{
    fn send(&mut self, bytes: &[u8], out: &mut dyn Write) {
        self(bytes, out)
    }
}

/// Why a token list was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// Token count outside `1..=255`.
    BadCount(usize),
}

/// Parse one token the way C `strtol(token, NULL, 16)` does on a 32-bit
/// target, truncated to a byte.
///
/// Leading whitespace, a sign and a `0x` prefix are accepted; parsing
/// stops at the first non-hex character and a token without digits
/// yields 0. Overflow saturates before truncation.
pub fn parse_hex_byte(token: &str) -> u8 {
    let s = token.trim_start().as_bytes();
    let (negative, s) = match s.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, s),
    };
    let s = match s {
        [b'0', b'x' | b'X', next, ..] if next.is_ascii_hexdigit() => &s[2..],
        _ => s,
    };

    let mut value: i64 = 0;
    for &c in s {
        let Some(digit) = (c as char).to_digit(16) else {
            break;
        };
        value = (value * 16 + digit as i64).min(i64::from(i32::MAX) + 1);
    }

    let long = if negative {
        (-value).max(i64::from(i32::MIN))
    } else {
        value.min(i64::from(i32::MAX))
    };
    long as i32 as u8
}

/// Parse a `send` token list into bytes.
pub fn parse_tokens<'t, I>(tokens: I) -> Result<Vec<u8, MAX_SEND_BYTES>, SendError>
where
    I: IntoIterator<Item = &'t str>,
{
    let mut bytes = Vec::new();
    let mut count = 0usize;
    for token in tokens {
        count += 1;
        // Past capacity we only count, so the error carries the real total.
        let _ = bytes.push(parse_hex_byte(token));
    }

    if count == 0 || count > MAX_SEND_BYTES {
        return Err(SendError::BadCount(count));
    }
    Ok(bytes)
}

/// Handle a `send` invocation: parse `args` and hand the bytes to `sink`.
pub fn run(args: &Args<'_>, out: &mut dyn Write, sink: &mut impl SendSink) {
    match parse_tokens(args.tokens()) {
        Ok(bytes) => sink.send(&bytes, out),
        Err(SendError::BadCount(_)) => {
            let _ = write!(out, "{}\r\n", SEND_USAGE);
        }
    }
}
