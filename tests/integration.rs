//! Integration tests for ble-midi-demo host-testable logic.

use ble_midi_demo::ble::adv_payload::{ad_structures, local_name, AdvertisingData};
use ble_midi_demo::ble::bonds::{BondRecord, BondStore, MasterKeyId, SysAttrs, BOND_STORE_SIZE};
use ble_midi_demo::ble::connection::{AddressKind, PeerAddress};
use ble_midi_demo::console::send::{parse_tokens, SendError};
use ble_midi_demo::midi::packet::{encode, PacketDecoder};
use ble_midi_demo::midi::MIDI_SERVICE_UUID;

#[test]
fn advertisement_carries_midi_service_and_name() {
    let data = AdvertisingData::midi_demo();
    assert!(data.validate().is_ok());

    let structures: Vec<(u8, &[u8])> = ad_structures(data.adv).collect();
    assert_eq!(structures[0], (0x01, &[0x06][..]));
    assert_eq!(structures[1].0, 0x07);
    assert_eq!(structures[1].1, MIDI_SERVICE_UUID.to_le_bytes());

    assert_eq!(local_name(data.scan_response), Some("BLE-MIDI Demo"));
}

#[test]
fn send_tokens_become_bytes() {
    let bytes = parse_tokens("90 40 7f".split_ascii_whitespace()).expect("three tokens");
    assert_eq!(bytes.as_slice(), &[0x90, 0x40, 0x7f]);
    assert_eq!(parse_tokens(core::iter::empty()), Err(SendError::BadCount(0)));
}

#[test]
fn sent_bytes_survive_the_ble_midi_framing() {
    let bytes = [0x90, 0x3C, 0x64, 0x3E, 0x64, 0x80, 0x3C, 0x00];
    let mut received = Vec::new();
    let mut decoder = PacketDecoder::new();

    encode(&bytes, 1234, 20, |packet| {
        decoder.decode(packet, |m| received.push(m))
    })
    .expect("encode");

    let flat: Vec<u8> = received
        .iter()
        .flat_map(|m| m.bytes.iter().copied())
        .collect();
    // Running status comes back expanded.
    assert_eq!(flat, [0x90, 0x3C, 0x64, 0x90, 0x3E, 0x64, 0x80, 0x3C, 0x00]);
    assert!(received.iter().all(|m| m.timestamp == 1234));
}

#[test]
fn bond_store_survives_a_reset() {
    let mut store = BondStore::new();
    for i in 0..3u8 {
        store.add(BondRecord {
            address: PeerAddress::new(AddressKind::RandomStatic, [i, 1, 2, 3, 4, 0xC0]),
            ltk: [i; 16],
            master_id: MasterKeyId {
                ediv: u16::from(i) * 100,
                rand: [i; 8],
            },
            key_flags: 0x01,
            irk: [0xA0 | i; 16],
            sys_attrs: SysAttrs::EMPTY,
        });
    }

    let mut flash = [0u8; BOND_STORE_SIZE];
    let len = store.serialize_all(&mut flash);

    let mut restored = BondStore::new();
    restored.deserialize_all(&flash[..len]);
    assert_eq!(restored.len(), 3);
    assert!(!restored.is_dirty());
    let wanted = MasterKeyId {
        ediv: 200,
        rand: [2; 8],
    };
    assert_eq!(restored.find_by_master_id(&wanted).map(|b| b.ltk), Some([2; 16]));
}
