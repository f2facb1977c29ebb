//! Advertising and scan-response payloads.
//!
//! Both payloads are built at compile time from AD structures
//! (`[len][type][data...]`). Legacy advertising caps each payload at
//! 31 bytes; the limit is asserted at compile time and checked again by
//! [`AdvertisingData::validate`] when the stack comes up.

use crate::config::{ADV_INTERVAL, ADV_PAYLOAD_MAX, DEVICE_NAME};
use crate::error::{Error, Result};
use crate::midi::MIDI_SERVICE_UUID;

/// AD type: Flags.
pub const AD_TYPE_FLAGS: u8 = 0x01;
/// AD type: Complete List of 128-bit Service Class UUIDs.
pub const AD_TYPE_COMPLETE_128_BIT_UUIDS: u8 = 0x07;
/// AD type: Shortened Local Name.
pub const AD_TYPE_SHORTENED_LOCAL_NAME: u8 = 0x08;
/// AD type: Complete Local Name.
pub const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// LE General Discoverable Mode | BR/EDR Not Supported.
pub const ADV_FLAGS_LE_ONLY_GENERAL_DISCOVERABLE: u8 = 0x06;

const ADV_DATA_LEN: usize = 3 + 2 + 16;
const SCAN_RESPONSE_LEN: usize = 2 + DEVICE_NAME.len();

/// Flags + complete list of 128-bit service UUIDs (BLE-MIDI service).
pub const ADV_DATA: [u8; ADV_DATA_LEN] = build_adv_data();

/// Complete local name.
pub const SCAN_RESPONSE_DATA: [u8; SCAN_RESPONSE_LEN] = build_scan_response();

const _: () = assert!(ADV_DATA.len() <= ADV_PAYLOAD_MAX);
const _: () = assert!(SCAN_RESPONSE_DATA.len() <= ADV_PAYLOAD_MAX);

const fn build_adv_data() -> [u8; ADV_DATA_LEN] {
    let mut out = [0u8; ADV_DATA_LEN];
    out[0] = 0x02;
    out[1] = AD_TYPE_FLAGS;
    out[2] = ADV_FLAGS_LE_ONLY_GENERAL_DISCOVERABLE;

    out[3] = 0x11;
    out[4] = AD_TYPE_COMPLETE_128_BIT_UUIDS;
    let uuid = MIDI_SERVICE_UUID.to_le_bytes();
    let mut i = 0;
    while i < uuid.len() {
        out[5 + i] = uuid[i];
        i += 1;
    }
    out
}

const fn build_scan_response() -> [u8; SCAN_RESPONSE_LEN] {
    let mut out = [0u8; SCAN_RESPONSE_LEN];
    out[0] = (SCAN_RESPONSE_LEN - 1) as u8;
    out[1] = AD_TYPE_COMPLETE_LOCAL_NAME;
    let name = DEVICE_NAME.as_bytes();
    let mut i = 0;
    while i < name.len() {
        out[2 + i] = name[i];
        i += 1;
    }
    out
}

/// GAP advertising parameters.
///
/// Advertising is always connectable and scannable undirected on all
/// three primary channels; only the interval is tunable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingParams {
    /// Advertising interval (0.625 ms units).
    pub interval: u16,
}

impl Default for AdvertisingParams {
    fn default() -> Self {
        Self {
            interval: ADV_INTERVAL,
        }
    }
}

/// A pair of advertising and scan-response payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvertisingData {
    pub adv: &'static [u8],
    pub scan_response: &'static [u8],
}

impl AdvertisingData {
    /// The payloads this peripheral advertises.
    pub const fn midi_demo() -> Self {
        Self {
            adv: &ADV_DATA,
            scan_response: &SCAN_RESPONSE_DATA,
        }
    }

    /// Check the 31-byte legacy advertising limit on both payloads.
    pub fn validate(&self) -> Result<()> {
        if self.adv.len() > ADV_PAYLOAD_MAX || self.scan_response.len() > ADV_PAYLOAD_MAX {
            return Err(Error::AdvPayloadTooLong);
        }
        Ok(())
    }
}

/// Iterator over the AD structures of a payload, yielding `(ad_type, data)`.
///
/// Stops at the first zero-length or truncated structure.
pub struct AdStructures<'a> {
    data: &'a [u8],
    pos: usize,
}

/// Walk the AD structures in `data`.
pub fn ad_structures(data: &[u8]) -> AdStructures<'_> {
    AdStructures { data, pos: 0 }
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.data.get(self.pos)? as usize;
        if len == 0 || self.pos + len >= self.data.len() {
            self.pos = self.data.len();
            return None;
        }
        let ad_type = self.data[self.pos + 1];
        let body = &self.data[self.pos + 2..self.pos + 1 + len];
        self.pos += len + 1;
        Some((ad_type, body))
    }
}

/// Extract the complete or shortened local name from a payload.
pub fn local_name(data: &[u8]) -> Option<&str> {
    ad_structures(data)
        .find(|(ty, _)| *ty == AD_TYPE_COMPLETE_LOCAL_NAME || *ty == AD_TYPE_SHORTENED_LOCAL_NAME)
        .and_then(|(_, name)| core::str::from_utf8(name).ok())
}
