//! MIDI transport over the BLE-MIDI GATT service.
//!
//! - [`packet`] frames outbound bytes into BLE-MIDI packets and splits
//!   inbound packets into timestamped messages.
//! - [`MidiTransport`] is the read/write pair the main loop and the send
//!   path use, keyed by connection handle.

pub mod packet;

use crate::ble::connection::ConnHandle;
use crate::error::Result;
use heapless::Vec;

/// BLE-MIDI service UUID `03B80E5A-EDE8-4B33-A751-6CE34EC4C700`.
pub const MIDI_SERVICE_UUID: u128 = 0x03B8_0E5A_EDE8_4B33_A751_6CE3_4EC4_C700;

/// BLE-MIDI timestamps are 13-bit millisecond counters.
pub const TIMESTAMP_MASK: u16 = 0x1FFF;

/// One MIDI message (or a 3-byte SysEx chunk) with its BLE-MIDI timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimestampedMessage {
    /// Milliseconds, modulo 8192.
    pub timestamp: u16,
    pub bytes: Vec<u8, 3>,
}

impl TimestampedMessage {
    pub fn new(timestamp: u16, bytes: &[u8]) -> Option<Self> {
        Some(Self {
            timestamp: timestamp & TIMESTAMP_MASK,
            bytes: Vec::from_slice(bytes).ok()?,
        })
    }
}

/// Read/write access to the MIDI characteristic of a connected central.
///
/// Both operations take `&self` so the `send` command and the inbound
/// poll can share one transport.
pub trait MidiTransport {
    /// Send `bytes` to the central on `handle`.
    fn write(&self, handle: ConnHandle, bytes: &[u8]) -> Result<()>;

    /// Take the next inbound message from `handle`, if any. Never blocks.
    fn read(&self, handle: ConnHandle) -> Option<TimestampedMessage>;
}
