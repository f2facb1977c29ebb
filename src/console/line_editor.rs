//! Byte-at-a-time line editor for the UART console.
//!
//! Echoes printable input, handles backspace, completes command names on
//! TAB and recalls earlier lines with the up/down arrow keys (`ESC [ A` /
//! `ESC [ B`). A line is handed back on CR or LF; a CR LF pair submits
//! once.

use core::fmt::Write;

use crate::config::CONSOLE_PROMPT;
use crate::console::command::Completer;
use heapless::{Deque, String};

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;
const TAB: u8 = b'\t';
const ESC: u8 = 0x1B;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Escape {
    Idle,
    Esc,
    Csi,
}

/// Line buffer of `N` bytes with an `H`-entry history.
pub struct LineEditor<const N: usize, const H: usize> {
    line: String<N>,
    history: Deque<String<N>, H>,
    /// History entry being shown, 0 = oldest.
    recall: Option<usize>,
    escape: Escape,
    last_was_cr: bool,
}

impl<const N: usize, const H: usize> Default for LineEditor<N, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const H: usize> LineEditor<N, H> {
    pub const fn new() -> Self {
        Self {
            line: String::new(),
            history: Deque::new(),
            recall: None,
            escape: Escape::Idle,
            last_was_cr: false,
        }
    }

    /// The line typed so far.
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn prompt(&self, out: &mut dyn Write) {
        let _ = out.write_str(CONSOLE_PROMPT);
    }

    /// Feed one received byte. Returns the finished line on Enter.
    pub fn feed(
        &mut self,
        byte: u8,
        out: &mut dyn Write,
        completer: &dyn Completer,
    ) -> Option<String<N>> {
        let after_cr = core::mem::replace(&mut self.last_was_cr, false);

        match self.escape {
            Escape::Esc => {
                self.escape = if byte == b'[' { Escape::Csi } else { Escape::Idle };
                return None;
            }
            Escape::Csi => {
                self.escape = Escape::Idle;
                match byte {
                    b'A' => self.history_up(out),
                    b'B' => self.history_down(out),
                    _ => {}
                }
                return None;
            }
            Escape::Idle => {}
        }

        match byte {
            b'\r' => {
                self.last_was_cr = true;
                Some(self.submit(out))
            }
            b'\n' if after_cr => None,
            b'\n' => Some(self.submit(out)),
            BACKSPACE | DELETE => {
                if self.line.pop().is_some() {
                    let _ = out.write_str("\x08 \x08");
                }
                None
            }
            TAB => {
                self.complete(out, completer);
                None
            }
            ESC => {
                self.escape = Escape::Esc;
                None
            }
            0x20..=0x7E => {
                let c = byte as char;
                if self.line.push(c).is_ok() {
                    let _ = out.write_char(c);
                }
                None
            }
            _ => None,
        }
    }

    fn submit(&mut self, out: &mut dyn Write) -> String<N> {
        let _ = out.write_str("\r\n");
        self.recall = None;
        let line = core::mem::take(&mut self.line);
        if !line.trim().is_empty() && self.history.back() != Some(&line) {
            if self.history.is_full() {
                self.history.pop_front();
            }
            let _ = self.history.push_back(line.clone());
        }
        line
    }

    fn history_up(&mut self, out: &mut dyn Write) {
        if self.history.is_empty() {
            return;
        }
        let index = match self.recall {
            None => self.history.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.show_history(index, out);
    }

    fn history_down(&mut self, out: &mut dyn Write) {
        match self.recall {
            Some(i) if i + 1 < self.history.len() => self.show_history(i + 1, out),
            Some(_) => {
                self.recall = None;
                self.replace_line("", out);
            }
            None => {}
        }
    }

    fn show_history(&mut self, index: usize, out: &mut dyn Write) {
        let Some(entry) = self.history.iter().nth(index).cloned() else {
            return;
        };
        self.recall = Some(index);
        self.replace_line(&entry, out);
    }

    fn replace_line(&mut self, text: &str, out: &mut dyn Write) {
        for _ in 0..self.line.len() {
            let _ = out.write_str("\x08 \x08");
        }
        self.line.clear();
        let _ = self.line.push_str(text);
        let _ = out.write_str(&self.line);
    }

    /// Complete the command name under the cursor. Only the first word is
    /// completed.
    fn complete(&mut self, out: &mut dyn Write, completer: &dyn Completer) {
        if self.line.contains(|c: char| c.is_ascii_whitespace()) {
            return;
        }

        let mut first: Option<&'static str> = None;
        let mut common = 0;
        let mut count = 0;
        completer.for_each_candidate(&self.line, &mut |name| {
            count += 1;
            match first {
                None => {
                    first = Some(name);
                    common = name.len();
                }
                Some(f) => common = common_prefix_len(&f[..common], name),
            }
        });

        let Some(first) = first else {
            return;
        };
        let typed = self.line.len();

        if count == 1 {
            self.append(&first[typed..], out);
            self.append(" ", out);
        } else if common > typed {
            self.append(&first[typed..common], out);
        } else {
            let _ = out.write_str("\r\n");
            completer.for_each_candidate(&self.line, &mut |name| {
                let _ = write!(out, "{}  ", name);
            });
            let _ = out.write_str("\r\n");
            self.prompt(out);
            let _ = out.write_str(&self.line);
        }
    }

    fn append(&mut self, text: &str, out: &mut dyn Write) {
        if self.line.push_str(text).is_ok() {
            let _ = out.write_str(text);
        }
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Names(&'static [&'static str]);

    impl Completer for Names {
        fn for_each_candidate(&self, prefix: &str, f: &mut dyn FnMut(&'static str)) {
            self.0.iter().copied().filter(|n| n.starts_with(prefix)).for_each(|n| f(n));
        }
    }

    const NAMES: Names = Names(&["help", "send", "sequence"]);

    type Editor = LineEditor<64, 2>;

    fn type_bytes(ed: &mut Editor, bytes: &[u8], out: &mut std::string::String) -> Vec<String<64>> {
        bytes
            .iter()
            .filter_map(|&b| ed.feed(b, out, &NAMES))
            .collect()
    }

    #[test]
    fn enter_returns_line_and_echoes() {
        let mut ed = Editor::new();
        let mut out = std::string::String::new();
        let lines = type_bytes(&mut ed, b"send 90\r", &mut out);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_str(), "send 90");
        assert_eq!(out, "send 90\r\n");
        assert_eq!(ed.line(), "");
    }

    #[test]
    fn crlf_submits_once() {
        let mut ed = Editor::new();
        let mut out = std::string::String::new();
        let lines = type_bytes(&mut ed, b"help\r\nhelp\n", &mut out);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn backspace_removes_last_char() {
        let mut ed = Editor::new();
        let mut out = std::string::String::new();
        type_bytes(&mut ed, b"sendx\x7f", &mut out);
        assert_eq!(ed.line(), "send");
        assert!(out.ends_with("x\x08 \x08"));

        out.clear();
        let mut empty = Editor::new();
        type_bytes(&mut empty, b"\x08", &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn tab_completes_unique_prefix() {
        let mut ed = Editor::new();
        let mut out = std::string::String::new();
        type_bytes(&mut ed, b"he\t", &mut out);
        assert_eq!(ed.line(), "help ");
        assert_eq!(out, "help ");
    }

    #[test]
    fn tab_extends_to_common_prefix_then_lists() {
        let mut ed = Editor::new();
        let mut out = std::string::String::new();
        type_bytes(&mut ed, b"s\t", &mut out);
        assert_eq!(ed.line(), "se");

        out.clear();
        type_bytes(&mut ed, b"\t", &mut out);
        assert_eq!(out, "\r\nsend  sequence  \r\n> se");
        assert_eq!(ed.line(), "se");
    }

    #[test]
    fn tab_after_first_word_is_ignored() {
        let mut ed = Editor::new();
        let mut out = std::string::String::new();
        type_bytes(&mut ed, b"send 9\t", &mut out);
        assert_eq!(ed.line(), "send 9");
    }

    #[test]
    fn up_arrow_recalls_previous_line() {
        let mut ed = Editor::new();
        let mut out = std::string::String::new();
        type_bytes(&mut ed, b"send 90\rhelp\r", &mut out);

        type_bytes(&mut ed, b"\x1b[A", &mut out);
        assert_eq!(ed.line(), "help");
        type_bytes(&mut ed, b"\x1b[A", &mut out);
        assert_eq!(ed.line(), "send 90");
        type_bytes(&mut ed, b"\x1b[A", &mut out);
        assert_eq!(ed.line(), "send 90");

        type_bytes(&mut ed, b"\x1b[B", &mut out);
        assert_eq!(ed.line(), "help");
        type_bytes(&mut ed, b"\x1b[B", &mut out);
        assert_eq!(ed.line(), "");
    }

    #[test]
    fn history_drops_oldest_and_skips_repeats() {
        let mut ed = Editor::new();
        let mut out = std::string::String::new();
        type_bytes(&mut ed, b"a\rb\rb\r\rc\r", &mut out);
        assert_eq!(ed.history_len(), 2);

        type_bytes(&mut ed, b"\x1b[A\x1b[A", &mut out);
        assert_eq!(ed.line(), "b");
    }

    #[test]
    fn full_line_drops_extra_chars() {
        let mut ed = LineEditor::<4, 1>::new();
        let mut out = std::string::String::new();
        for &b in b"abcdef" {
            ed.feed(b, &mut out, &NAMES);
        }
        assert_eq!(ed.line(), "abcd");
        assert_eq!(out, "abcd");
    }
}
