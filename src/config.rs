//! Application-wide constants and compile-time configuration.
//!
//! Timing parameters, capacities, pin assignments and protocol
//! constants live here so they can be tuned in one place.

// BLE

/// GAP device name, also used as the complete local name in the scan response.
pub const DEVICE_NAME: &str = "BLE-MIDI Demo";

/// Advertising interval (in 0.625 ms units). 800 = 500 ms.
pub const ADV_INTERVAL: u16 = 800;

/// Largest legacy advertising or scan-response payload.
pub const ADV_PAYLOAD_MAX: usize = 31;

/// ATT MTU requested from centrals. 247 leaves 244 bytes per notification.
pub const ATT_MTU: u16 = 247;

/// Maximum number of bonded centrals remembered across resets.
pub const MAX_BONDS: usize = 4;

/// GATT system attributes (CCCD values) kept per bond.
pub const SYS_ATTRS_CAPACITY: usize = 62;

/// Notifications the SoftDevice queues per link before `notify` fails.
/// Covers a 255-byte `send` of single-byte messages at the default MTU.
pub const HVN_TX_QUEUE_SIZE: u8 = 32;

// Console

/// UART baud rate of the console (8N1).
pub const CONSOLE_BAUD: u32 = 115_200;

// UART pin assignments (nRF52840-DK virtual COM port)
//
//   Console RX  → P0.08
//   Console TX  → P0.06

/// UART receive ring buffer.
pub const CONSOLE_RX_BUFFER: usize = 256;

/// UART transmit ring buffer.
pub const CONSOLE_TX_BUFFER: usize = 256;

/// Console output staged per loop iteration before it goes to the UART.
/// Holds the hex dump of a 255-byte `send` or a full inbox of messages.
pub const CONSOLE_OUT_CAPACITY: usize = 2048;

/// Longest editable console line. Large enough for `send` with 255 tokens.
pub const CONSOLE_LINE_CAPACITY: usize = 1024;

/// Number of previous lines kept for up/down arrow recall.
pub const CONSOLE_HISTORY_DEPTH: usize = 4;

/// Maximum number of registered console commands, not counting `help`.
pub const MAX_COMMANDS: usize = 4;

/// Console prompt printed before each line.
pub const CONSOLE_PROMPT: &str = "> ";

// MIDI

/// Upper bound on the number of bytes a single `send` accepts.
pub const MAX_SEND_BYTES: usize = 255;

/// Inbound MIDI messages buffered between the GATT server and the main loop.
pub const MIDI_INBOX_DEPTH: usize = 32;

/// Stack events buffered between the BLE task and the main loop.
pub const STACK_EVENT_QUEUE_DEPTH: usize = 8;

// Bond storage

/// Flash page index where bond storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for bond storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;
