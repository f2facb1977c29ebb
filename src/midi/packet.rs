//! BLE-MIDI packet framing.
//!
//! Packet layout:
//! ```text
//! Byte 0:    header     0b10hh_hhhh  (timestamp bits 12..7)
//! Byte 1:    timestamp  0b1lll_llll  (timestamp bits 6..0)
//! Byte 2..:  MIDI bytes; every status byte after the first is
//!            preceded by another timestamp byte
//! ```
//!
//! Running status is allowed: data bytes may follow a complete message
//! without repeating the status. SysEx is streamed in 3-byte chunks.

use crate::error::{Error, Result};
use crate::midi::{TimestampedMessage, TIMESTAMP_MASK};
use heapless::Vec;

/// Largest packet we build, one notification at an ATT MTU of 247.
pub const MAX_PACKET_SIZE: usize = 244;

/// Smallest usable packet: header, timestamp and one MIDI byte.
pub const MIN_PACKET_SIZE: usize = 3;

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

/// Header byte for `timestamp` (milliseconds).
pub fn header_byte(timestamp: u16) -> u8 {
    0x80 | (((timestamp & TIMESTAMP_MASK) >> 7) as u8 & 0x3F)
}

/// Timestamp byte for `timestamp` (milliseconds).
pub fn timestamp_byte(timestamp: u16) -> u8 {
    0x80 | (timestamp as u8 & 0x7F)
}

/// Packet size that fits one notification at the given ATT MTU.
pub fn notify_payload(att_mtu: u16) -> usize {
    usize::from(att_mtu)
        .saturating_sub(3)
        .clamp(MIN_PACKET_SIZE, MAX_PACKET_SIZE)
}

/// Frame `bytes` into one or more BLE-MIDI packets of at most
/// `max_payload` bytes each, passing every packet to `emit`.
///
/// Nothing is emitted for an empty input.
pub fn encode<F>(bytes: &[u8], timestamp: u16, max_payload: usize, mut emit: F) -> Result<()>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    let max = max_payload.clamp(MIN_PACKET_SIZE, MAX_PACKET_SIZE);
    let header = header_byte(timestamp);
    let ts = timestamp_byte(timestamp);

    let mut buf = [0u8; MAX_PACKET_SIZE];
    buf[0] = header;
    buf[1] = ts;
    let mut len = 2;
    let mut after_ts = true;

    for &b in bytes {
        let is_status = b & 0x80 != 0;
        let need = if is_status && !after_ts { 2 } else { 1 };
        if len + need > max {
            emit(&buf[..len])?;
            len = 2;
            after_ts = true;
        }
        if is_status && !after_ts {
            buf[len] = ts;
            len += 1;
        }
        buf[len] = b;
        len += 1;
        after_ts = false;
    }

    if len > 2 {
        emit(&buf[..len])?;
    }
    Ok(())
}

/// Number of bytes in a message starting with `status`, status included.
pub fn message_len(status: u8) -> usize {
    match status {
        0x80..=0xBF | 0xE0..=0xEF | 0xF2 => 3,
        0xC0..=0xDF | 0xF1 | 0xF3 => 2,
        _ => 1,
    }
}

/// Splits inbound packets into [`TimestampedMessage`]s.
///
/// Running status and an unfinished SysEx carry over between packets.
#[derive(Debug, Default)]
pub struct PacketDecoder {
    running: Option<u8>,
    in_sysex: bool,
    msg: Vec<u8, 3>,
    needed: usize,
}

impl PacketDecoder {
    pub const fn new() -> Self {
        Self {
            running: None,
            in_sysex: false,
            msg: Vec::new(),
            needed: 0,
        }
    }

    /// Decode one packet, handing each complete message to `on_message`.
    ///
    /// Fails only on a missing or malformed header; the rest of the
    /// packet is decoded leniently.
    pub fn decode<F>(&mut self, packet: &[u8], mut on_message: F) -> Result<()>
    where
        F: FnMut(TimestampedMessage),
    {
        let (&header, body) = packet.split_first().ok_or(Error::MalformedPacket)?;
        if header & 0xC0 != 0x80 || body.is_empty() {
            return Err(Error::MalformedPacket);
        }

        let mut ts_high = (header & 0x3F) as u16;
        let mut last_low: Option<u16> = None;
        let mut timestamp = ts_high << 7;
        let mut after_ts = false;

        for &b in body {
            if b & 0x80 != 0 && !after_ts {
                let low = (b & 0x7F) as u16;
                if last_low.is_some_and(|prev| low < prev) {
                    ts_high = (ts_high + 1) & 0x3F;
                }
                last_low = Some(low);
                timestamp = (ts_high << 7) | low;
                after_ts = true;
                continue;
            }

            after_ts = false;
            if b & 0x80 != 0 {
                self.status(b, timestamp, &mut on_message);
            } else {
                self.data(b, timestamp, &mut on_message);
            }
        }
        Ok(())
    }

    fn status<F: FnMut(TimestampedMessage)>(&mut self, b: u8, ts: u16, on_message: &mut F) {
        // Real-time bytes may interleave anything, including SysEx.
        if b >= 0xF8 {
            if let Some(msg) = TimestampedMessage::new(ts, &[b]) {
                on_message(msg);
            }
            return;
        }

        if b == SYSEX_END {
            if self.in_sysex {
                if self.msg.is_full() {
                    self.flush(ts, on_message);
                }
                let _ = self.msg.push(SYSEX_END);
                self.flush(ts, on_message);
                self.in_sysex = false;
            }
            return;
        }

        if self.in_sysex {
            self.flush(ts, on_message);
            self.in_sysex = false;
        }

        self.msg.clear();
        let _ = self.msg.push(b);
        if b == SYSEX_START {
            self.in_sysex = true;
            self.running = None;
            return;
        }

        self.needed = message_len(b);
        self.running = (b < 0xF0).then_some(b);
        if self.needed == 1 {
            self.flush(ts, on_message);
        }
    }

    fn data<F: FnMut(TimestampedMessage)>(&mut self, b: u8, ts: u16, on_message: &mut F) {
        if self.in_sysex {
            if self.msg.is_full() {
                self.flush(ts, on_message);
            }
            let _ = self.msg.push(b);
            return;
        }

        if self.msg.is_empty() {
            let Some(status) = self.running else {
                return;
            };
            let _ = self.msg.push(status);
            self.needed = message_len(status);
        }

        let _ = self.msg.push(b);
        if self.msg.len() >= self.needed {
            self.flush(ts, on_message);
        }
    }

    fn flush<F: FnMut(TimestampedMessage)>(&mut self, ts: u16, on_message: &mut F) {
        if self.msg.is_empty() {
            return;
        }
        on_message(TimestampedMessage {
            timestamp: ts & TIMESTAMP_MASK,
            bytes: self.msg.clone(),
        });
        self.msg.clear();
    }
}
