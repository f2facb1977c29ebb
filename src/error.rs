//! Unified error type for the BLE-MIDI demo.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (with the `defmt` feature) for on-target
//! logging and `Display` for console output.

use core::fmt;

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // BLE
    /// A GATT operation on the MIDI characteristic failed.
    Gatt(GattError),

    /// An inbound BLE-MIDI packet has no valid header.
    MalformedPacket,

    /// An advertising or scan-response payload exceeds 31 bytes.
    AdvPayloadTooLong,

    // Console
    /// No room left in the command table.
    CommandTableFull,

    /// UART read or write failed.
    Console,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Subset of GATT errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GattError {
    /// Raw error code from the SoftDevice.
    Raw(u32),
    /// The central has not enabled notifications on the MIDI characteristic.
    NotifyDisabled,
    /// The link went away while notifying.
    Disconnected,
}

impl From<GattError> for Error {
    fn from(e: GattError) -> Self {
        Error::Gatt(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Gatt(GattError::Raw(code)) => write!(f, "GATT error 0x{:04x}", code),
            Error::Gatt(GattError::NotifyDisabled) => f.write_str("notifications not enabled"),
            Error::Gatt(GattError::Disconnected) => f.write_str("link lost"),
            Error::MalformedPacket => f.write_str("malformed BLE-MIDI packet"),
            Error::AdvPayloadTooLong => f.write_str("advertising payload exceeds 31 bytes"),
            Error::CommandTableFull => f.write_str("command table full"),
            Error::Console => f.write_str("console I/O error"),
            Error::BufferOverflow => f.write_str("buffer overflow"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
