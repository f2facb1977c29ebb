//! Test-only library interface for the BLE-MIDI demo.
//!
//! This module re-exports the pure logic modules that can be tested
//! on the host (no embedded hardware required): the console, the `send`
//! command, the stack event dispatcher, advertising payloads, BLE-MIDI
//! framing and bond bookkeeping.
//!
//! Usage: `cargo test --lib` or `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main].
//! This lib.rs provides a separate entry point for host-based testing.

#![cfg_attr(not(test), no_std)]

pub mod app;
pub mod config;
pub mod error;
pub mod midi;

// ═══════════════════════════════════════════════════════════════════════════
// BLE Module (hardware-independent parts)
// ═══════════════════════════════════════════════════════════════════════════

pub mod ble {
    pub mod adv_payload;
    pub mod bonds;
    pub mod connection;
    pub mod events;
}

// ═══════════════════════════════════════════════════════════════════════════
// Console Module (everything but the UART)
// ═══════════════════════════════════════════════════════════════════════════

pub mod console {
    pub mod command;
    pub mod line_editor;
    pub mod send;
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - whole-path scenarios across modules
// ═══════════════════════════════════════════════════════════════════════════
