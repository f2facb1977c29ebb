//! Main-loop pieces that do not touch hardware.
//!
//! The embedded main task owns the UART and the channels; everything it
//! does with a byte, a line, an inbound message or a stack event goes
//! through the functions here so the host tests see the same behaviour.

use core::fmt::{self, Write};

use crate::ble::connection::ConnectionManager;
use crate::ble::events::{BleStack, EventDispatcher, Notice, StackEvent};
use crate::console::command::CommandTable;
use crate::console::line_editor::LineEditor;
use crate::console::send::SendSink;
use crate::midi::MidiTransport;

/// Formats bytes as uppercase hex pairs separated by spaces.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

/// Send sink that writes to the connected central, if there is one.
pub struct MidiSender<'a, T: MidiTransport> {
    conn: &'a ConnectionManager,
    transport: &'a T,
}

impl<'a, T: MidiTransport> MidiSender<'a, T> {
    pub fn new(conn: &'a ConnectionManager, transport: &'a T) -> Self {
        Self { conn, transport }
    }
}

impl<T: MidiTransport> SendSink for MidiSender<'_, T> {
    fn send(&mut self, bytes: &[u8], out: &mut dyn Write) {
        let Some(handle) = self.conn.handle() else {
            let _ = out.write_str("Not connected yet\r\n");
            return;
        };

        let _ = write!(out, "Sending MIDI bytes: {}\r\n", HexDump(bytes));
        if let Err(e) = self.transport.write(handle, bytes) {
            let _ = write!(out, "MIDI write failed: {}\r\n", e);
        }
    }
}

/// Print the startup banner.
pub fn print_banner(out: &mut dyn Write) {
    let _ = out.write_str(
        "Cli is running.\r\n\
         Type \"help\" for a list of commands\r\n\
         Use backspace and tab to remove chars and autocomplete\r\n\
         Use up and down arrows to recall previous commands\r\n",
    );
}

/// Feed one console byte; on Enter run the line and print a new prompt.
pub fn handle_console_byte<const N: usize, const H: usize>(
    byte: u8,
    editor: &mut LineEditor<N, H>,
    commands: &mut CommandTable<'_>,
    out: &mut dyn Write,
) {
    if let Some(line) = editor.feed(byte, out, &*commands) {
        commands.execute(&line, out);
        editor.prompt(out);
    }
}

/// Print every queued inbound message. Does nothing while disconnected.
///
/// Returns the number of messages printed.
pub fn poll_inbound<T: MidiTransport>(
    conn: &ConnectionManager,
    transport: &T,
    out: &mut dyn Write,
) -> usize {
    let Some(handle) = conn.handle() else {
        return 0;
    };

    let mut printed = 0;
    while let Some(msg) = transport.read(handle) {
        let _ = write!(out, "ts:{}  MIDI: {}\r\n", msg.timestamp, HexDump(&msg.bytes));
        printed += 1;
    }
    printed
}

/// Dispatch one stack event and print its notice, if any.
///
/// The notice is returned as well so the caller can log it.
pub fn report_event(
    dispatcher: &EventDispatcher<'_>,
    event: StackEvent,
    stack: &mut impl BleStack,
    out: &mut dyn Write,
) -> Option<Notice> {
    let notice = dispatcher.dispatch(event, stack)?;
    let _ = write!(out, "{}\r\n", notice);
    Some(notice)
}
