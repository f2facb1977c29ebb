//! UART command console.
//!
//! Bytes from the UART go through the [`line_editor`], finished lines
//! through the [`command`] table. `send` is the only registered command
//! besides the built-in `help`.

pub mod command;
pub mod line_editor;
pub mod send;
pub mod uart;
