//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Advertising** - connectable undirected advertising of the
//!    BLE-MIDI service with the device name in the scan response.
//! 2. **MIDI service** - GATT server exposing the BLE-MIDI I/O
//!    characteristic; writes are decoded into the MIDI inbox, outbound
//!    bytes are sent as notifications.
//! 3. **Security** - Just Works pairing with bonding; keys are kept in
//!    the [`bonds::BondStore`] and persisted to flash.
//!
//! Everything the SoftDevice reports is turned into a
//! [`events::StackEvent`] and handed to the main loop over a channel,
//! where the [`events::EventDispatcher`] reacts to it.

pub mod adv_payload;
pub mod bonds;
pub mod connection;
pub mod events;
pub mod midi_service;
pub mod peripheral;
