//! Bond bookkeeping for centrals that paired with us.
//!
//! The store is plain RAM; `storage.rs` persists it to flash as one
//! serialized blob so bonds survive a reset.
//!
//! Record layout (113 bytes):
//! ```text
//! [0..6]   peer identity address (little-endian)
//! [6]      address type code
//! [7..23]  long term key
//! [23..25] EDIV (little-endian)
//! [25..33] RAND
//! [33]     key flags (authenticated, LESC, ...)
//! [34..50] identity resolving key
//! [50]     GATT system attributes length
//! [51..113] GATT system attributes (CCCD values)
//! ```

use crate::ble::connection::{AddressKind, PeerAddress};
use crate::config::{MAX_BONDS, SYS_ATTRS_CAPACITY};
use heapless::Vec;

/// Serialized size of a single [`BondRecord`].
pub const BOND_RECORD_SIZE: usize = 51 + SYS_ATTRS_CAPACITY;

/// Serialized size of a full [`BondStore`] (count byte + records).
pub const BOND_STORE_SIZE: usize = 1 + MAX_BONDS * BOND_RECORD_SIZE;

/// Identifies the key a central asks for when re-encrypting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MasterKeyId {
    pub ediv: u16,
    pub rand: [u8; 8],
}

/// CCCD bit for notifications.
const CCCD_NOTIFY: u16 = 0x0001;

/// GATT system attributes of a bonded central, as the SoftDevice
/// exports them: `(handle, length, value)` entries followed by a CRC16.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SysAttrs {
    len: u8,
    data: [u8; SYS_ATTRS_CAPACITY],
}

impl SysAttrs {
    /// No attributes stored yet.
    pub const EMPTY: Self = Self {
        len: 0,
        data: [0; SYS_ATTRS_CAPACITY],
    };

    /// `None` if `attrs` does not fit.
    pub fn from_slice(attrs: &[u8]) -> Option<Self> {
        if attrs.len() > SYS_ATTRS_CAPACITY {
            return None;
        }
        let mut data = [0; SYS_ATTRS_CAPACITY];
        data[..attrs.len()].copy_from_slice(attrs);
        Some(Self {
            len: attrs.len() as u8,
            data,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..usize::from(self.len)]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether any CCCD in the attributes has notifications enabled.
    ///
    /// The only notifying characteristic we serve is the MIDI I/O one.
    pub fn notifications_enabled(&self) -> bool {
        let mut rest = self.as_slice();
        // Two trailing bytes are the CRC.
        while rest.len() >= 4 + 2 {
            let len = usize::from(u16::from_le_bytes([rest[2], rest[3]]));
            let Some(value) = rest.get(4..4 + len) else {
                return false;
            };
            if len == 2 && u16::from_le_bytes([value[0], value[1]]) & CCCD_NOTIFY != 0 {
                return true;
            }
            rest = &rest[4 + len..];
        }
        false
    }
}

/// Key material exchanged during bonding with one central.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BondRecord {
    pub address: PeerAddress,
    pub ltk: [u8; 16],
    pub master_id: MasterKeyId,
    pub key_flags: u8,
    pub irk: [u8; 16],
    pub sys_attrs: SysAttrs,
}

impl BondRecord {
    /// Serialize into `buf`. Returns bytes written, 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < BOND_RECORD_SIZE {
            return 0;
        }
        buf[0..6].copy_from_slice(&self.address.bytes);
        buf[6] = self.address.kind.code();
        buf[7..23].copy_from_slice(&self.ltk);
        buf[23..25].copy_from_slice(&self.master_id.ediv.to_le_bytes());
        buf[25..33].copy_from_slice(&self.master_id.rand);
        buf[33] = self.key_flags;
        buf[34..50].copy_from_slice(&self.irk);
        buf[50] = self.sys_attrs.len;
        buf[51..BOND_RECORD_SIZE].copy_from_slice(&self.sys_attrs.data);
        BOND_RECORD_SIZE
    }

    /// Deserialize one record. Unknown address types and oversized
    /// system attributes are rejected.
    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < BOND_RECORD_SIZE {
            return None;
        }
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&data[0..6]);
        let kind = AddressKind::from_code(data[6])?;
        let mut ltk = [0u8; 16];
        ltk.copy_from_slice(&data[7..23]);
        let mut rand = [0u8; 8];
        rand.copy_from_slice(&data[25..33]);
        let mut irk = [0u8; 16];
        irk.copy_from_slice(&data[34..50]);
        let sys_attrs_len = usize::from(data[50]);
        if sys_attrs_len > SYS_ATTRS_CAPACITY {
            return None;
        }
        let sys_attrs = SysAttrs::from_slice(&data[51..51 + sys_attrs_len])?;

        Some(Self {
            address: PeerAddress::new(kind, addr),
            ltk,
            master_id: MasterKeyId {
                ediv: u16::from_le_bytes([data[23], data[24]]),
                rand,
            },
            key_flags: data[33],
            irk,
            sys_attrs,
        })
    }
}

/// In-memory list of bonds, oldest first.
#[derive(Clone, Debug, Default)]
pub struct BondStore {
    bonds: Vec<BondRecord, MAX_BONDS>,
    dirty: bool,
}

impl BondStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            bonds: Vec::new(),
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// True if the store changed since the last load or save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = &BondRecord> {
        self.bonds.iter()
    }

    /// Add a new bond.
    ///
    /// A record for the same peer address or the same master id is
    /// replaced in place. When full, the oldest record is evicted.
    pub fn add(&mut self, record: BondRecord) {
        if let Some(existing) = self
            .bonds
            .iter_mut()
            .find(|b| b.address == record.address || b.master_id == record.master_id)
        {
            *existing = record;
            self.dirty = true;
            return;
        }

        if self.bonds.is_full() {
            self.bonds.remove(0);
        }
        let _ = self.bonds.push(record);
        self.dirty = true;
    }

    /// Delete the bond for `address`. Returns whether one was removed.
    pub fn remove(&mut self, address: &PeerAddress) -> bool {
        match self.bonds.iter().position(|b| b.address == *address) {
            Some(idx) => {
                self.bonds.remove(idx);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Record the GATT system attributes for a bonded `address`.
    ///
    /// Returns whether the store changed; attributes for unknown peers
    /// or too large to keep are ignored.
    pub fn set_sys_attrs(&mut self, address: &PeerAddress, attrs: &[u8]) -> bool {
        let Some(attrs) = SysAttrs::from_slice(attrs) else {
            return false;
        };
        let Some(bond) = self.bonds.iter_mut().find(|b| b.address == *address) else {
            return false;
        };
        if bond.sys_attrs == attrs {
            return false;
        }
        bond.sys_attrs = attrs;
        self.dirty = true;
        true
    }

    pub fn find_by_master_id(&self, master_id: &MasterKeyId) -> Option<&BondRecord> {
        self.bonds.iter().find(|b| b.master_id == *master_id)
    }

    pub fn find_by_address(&self, address: &PeerAddress) -> Option<&BondRecord> {
        self.bonds.iter().find(|b| b.address == *address)
    }

    /// Serialize all bonds. Returns bytes written, 0 if `buf` is too small.
    pub fn serialize_all(&self, buf: &mut [u8]) -> usize {
        if buf.len() < 1 + self.bonds.len() * BOND_RECORD_SIZE {
            return 0;
        }
        buf[0] = self.bonds.len() as u8;
        let mut offset = 1;
        for bond in &self.bonds {
            offset += bond.serialize(&mut buf[offset..]);
        }
        offset
    }

    /// Replace the contents with bonds read from `data`.
    ///
    /// Truncated or corrupt trailing records are skipped.
    pub fn deserialize_all(&mut self, data: &[u8]) {
        self.bonds.clear();
        self.dirty = false;
        let Some((&count, mut rest)) = data.split_first() else {
            return;
        };

        for _ in 0..count {
            if rest.len() < BOND_RECORD_SIZE {
                break;
            }
            let (record, tail) = rest.split_at(BOND_RECORD_SIZE);
            rest = tail;
            if let Some(bond) = BondRecord::deserialize(record) {
                if self.bonds.push(bond).is_err() {
                    break;
                }
            }
        }
    }
}
