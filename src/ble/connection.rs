//! Connection handle bookkeeping.
//!
//! The manager starts out without a handle, is set when a central
//! enables the MIDI service and cleared when it goes away. Everything
//! else only reads it.

use core::cell::Cell;
use core::fmt;

/// Opaque per-link identifier issued by the BLE stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnHandle(pub u16);

/// BLE device address type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressKind {
    Public,
    RandomStatic,
    RandomPrivateResolvable,
    RandomPrivateNonResolvable,
    Anonymous,
}

impl AddressKind {
    /// Stable numeric code, used in notices and the bond record layout.
    pub const fn code(self) -> u8 {
        match self {
            AddressKind::Public => 0,
            AddressKind::RandomStatic => 1,
            AddressKind::RandomPrivateResolvable => 2,
            AddressKind::RandomPrivateNonResolvable => 3,
            AddressKind::Anonymous => 4,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AddressKind::Public),
            1 => Some(AddressKind::RandomStatic),
            2 => Some(AddressKind::RandomPrivateResolvable),
            3 => Some(AddressKind::RandomPrivateNonResolvable),
            4 => Some(AddressKind::Anonymous),
            _ => None,
        }
    }
}

/// A peer or local device address.
///
/// `bytes` are little-endian as they travel over the air; `Display`
/// prints the usual most-significant-first colon notation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddress {
    pub kind: AddressKind,
    pub bytes: [u8; 6],
}

impl PeerAddress {
    pub const fn new(kind: AddressKind, bytes: [u8; 6]) -> Self {
        Self { kind, bytes }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

/// Owner of the current connection handle.
///
/// Uses a `Cell` so the event dispatcher and the send path can share a
/// reference on a single-threaded executor.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    handle: Cell<Option<ConnHandle>>,
}

impl ConnectionManager {
    /// Create a manager with no active connection.
    pub const fn new() -> Self {
        Self {
            handle: Cell::new(None),
        }
    }

    /// Current handle, `None` while no peer is connected.
    pub fn handle(&self) -> Option<ConnHandle> {
        self.handle.get()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Record the handle of a newly connected MIDI client.
    pub fn connect(&self, handle: ConnHandle) {
        self.handle.set(Some(handle));
    }

    /// Forget the current handle.
    pub fn disconnect(&self) {
        self.handle.set(None);
    }
}
