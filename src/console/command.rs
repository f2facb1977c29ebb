//! Command table and dispatcher.
//!
//! A line is split on whitespace; the first token names the command,
//! the rest are handed to the bound handler. `help` is built in.
//! Lines naming no registered command go to the default handler, which
//! echoes the command name and its arguments.

use core::fmt::{self, Write};

use crate::config::MAX_COMMANDS;
use crate::error::{Error, Result};
use heapless::Vec;

/// Help text of the built-in `help` command.
pub const HELP_HELP: &str = "Print list of commands";

/// Arguments following the command name.
#[derive(Clone, Copy, Debug)]
pub struct Args<'a> {
    raw: &'a str,
    tokenize: bool,
}

impl<'a> Args<'a> {
    pub fn new(raw: &'a str, tokenize: bool) -> Self {
        Self {
            raw: raw.trim(),
            tokenize,
        }
    }

    /// Everything after the command name, trimmed.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Whitespace-separated tokens, or the whole argument string as a
    /// single token when the binding does not tokenize.
    pub fn tokens(&self) -> impl Iterator<Item = &'a str> {
        let raw = self.raw;
        let tokenize = self.tokenize;
        let whole = (!tokenize && !raw.is_empty()).then_some(raw);
        raw.split_ascii_whitespace()
            .filter(move |_| tokenize)
            .chain(whole)
    }

    pub fn count(&self) -> usize {
        self.tokens().count()
    }

    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.tokens().nth(index)
    }
}

/// Handler bound to a command: receives the arguments and the console.
pub type Handler<'a> = &'a mut dyn FnMut(&Args<'_>, &mut dyn Write);

/// A registered console command.
pub struct CommandBinding<'a> {
    pub name: &'static str,
    pub help: &'static str,
    /// Split the arguments into tokens before calling the handler.
    pub tokenize_args: bool,
    handler: Handler<'a>,
}

impl<'a> CommandBinding<'a> {
    pub fn new(
        name: &'static str,
        help: &'static str,
        tokenize_args: bool,
        handler: Handler<'a>,
    ) -> Self {
        Self {
            name,
            help,
            tokenize_args,
            handler,
        }
    }
}

impl fmt::Debug for CommandBinding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBinding")
            .field("name", &self.name)
            .field("tokenize_args", &self.tokenize_args)
            .finish()
    }
}

/// Supplies command names for tab completion.
pub trait Completer {
    /// Call `f` with every command name starting with `prefix`.
    fn for_each_candidate(&self, prefix: &str, f: &mut dyn FnMut(&'static str));
}

/// Fixed-capacity set of command bindings.
#[derive(Debug, Default)]
pub struct CommandTable<'a> {
    bindings: Vec<CommandBinding<'a>, MAX_COMMANDS>,
}

impl<'a> CommandTable<'a> {
    pub const fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Register a command. Names are matched exactly.
    pub fn add_binding(&mut self, binding: CommandBinding<'a>) -> Result<()> {
        self.bindings
            .push(binding)
            .map_err(|_| Error::CommandTableFull)
    }

    /// Tokenize `line` and run the matching handler.
    pub fn execute(&mut self, line: &str, out: &mut dyn Write) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let (name, rest) = line
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((line, ""));

        if name == "help" {
            self.print_help(Args::new(rest, true).get(0), out);
            return;
        }

        match self.bindings.iter_mut().find(|b| b.name == name) {
            Some(binding) => {
                let args = Args::new(rest, binding.tokenize_args);
                (binding.handler)(&args, out);
            }
            None => default_handler(name, &Args::new(rest, true), out),
        }
    }

    fn print_help(&self, command: Option<&str>, out: &mut dyn Write) {
        match command {
            None => {
                let _ = write!(out, " * help\r\n\t{}\r\n", HELP_HELP);
                for b in &self.bindings {
                    let _ = write!(out, " * {}\r\n\t{}\r\n", b.name, b.help);
                }
            }
            Some("help") => {
                let _ = write!(out, " * help\r\n\t{}\r\n", HELP_HELP);
            }
            Some(name) => match self.bindings.iter().find(|b| b.name == name) {
                Some(b) => {
                    let _ = write!(out, " * {}\r\n\t{}\r\n", b.name, b.help);
                }
                None => {
                    let _ = write!(out, "Unknown command: \"{}\"\r\n", name);
                }
            },
        }
    }
}

impl Completer for CommandTable<'_> {
    fn for_each_candidate(&self, prefix: &str, f: &mut dyn FnMut(&'static str)) {
        if "help".starts_with(prefix) {
            f("help");
        }
        for b in &self.bindings {
            if b.name.starts_with(prefix) {
                f(b.name);
            }
        }
    }
}

fn default_handler(name: &str, args: &Args<'_>, out: &mut dyn Write) {
    let _ = write!(out, "Received command: {}\r\n", name);
    for (i, token) in args.tokens().enumerate() {
        let _ = write!(out, "Arg {} : {}\r\n", i, token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String;
    use std::vec::Vec as StdVec;

    #[test]
    fn args_tokenize_on_whitespace() {
        let args = Args::new("  90\t40   7f ", true);
        assert_eq!(args.count(), 3);
        assert_eq!(args.get(1), Some("40"));
        assert_eq!(args.raw(), "90\t40   7f");
    }

    #[test]
    fn untokenized_args_are_one_token() {
        let args = Args::new(" hello world ", false);
        assert_eq!(args.tokens().collect::<StdVec<_>>(), ["hello world"]);
        assert_eq!(Args::new("   ", false).count(), 0);
    }

    #[test]
    fn execute_dispatches_to_matching_binding() {
        let mut seen: StdVec<String> = StdVec::new();
        let mut handler = |args: &Args<'_>, _out: &mut dyn Write| {
            seen.extend(args.tokens().map(String::from));
        };
        let mut table = CommandTable::new();
        table
            .add_binding(CommandBinding::new("send", "help text", true, &mut handler))
            .unwrap();

        let mut out = String::new();
        table.execute("send 90 40 7f", &mut out);
        drop(table);

        assert_eq!(seen, ["90", "40", "7f"]);
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_command_echoes_name_and_args() {
        let mut table = CommandTable::new();
        let mut out = String::new();
        table.execute("frob a b", &mut out);
        assert_eq!(out, "Received command: frob\r\nArg 0 : a\r\nArg 1 : b\r\n");
    }

    #[test]
    fn blank_line_is_ignored() {
        let mut table = CommandTable::new();
        let mut out = String::new();
        table.execute("   \t ", &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn help_lists_every_binding() {
        let mut noop = |_: &Args<'_>, _: &mut dyn Write| {};
        let mut table = CommandTable::new();
        table
            .add_binding(CommandBinding::new("send", "Send bytes", true, &mut noop))
            .unwrap();

        let mut out = String::new();
        table.execute("help", &mut out);
        assert_eq!(
            out,
            " * help\r\n\tPrint list of commands\r\n * send\r\n\tSend bytes\r\n"
        );

        out.clear();
        table.execute("help send", &mut out);
        assert_eq!(out, " * send\r\n\tSend bytes\r\n");

        out.clear();
        table.execute("help nope", &mut out);
        assert_eq!(out, "Unknown command: \"nope\"\r\n");
    }

    #[test]
    fn table_capacity_is_enforced() {
        fn noop(_: &Args<'_>, _: &mut dyn Write) {}
        let mut noops = [noop as fn(&Args<'_>, &mut dyn Write); MAX_COMMANDS + 1];
        let mut table = CommandTable::new();
        let mut results = StdVec::new();
        for h in noops.iter_mut() {
            results.push(table.add_binding(CommandBinding::new("x", "", true, h)));
        }
        assert!(results[..MAX_COMMANDS].iter().all(|r| r.is_ok()));
        assert_eq!(results[MAX_COMMANDS], Err(Error::CommandTableFull));
    }

    #[test]
    fn completion_candidates_include_builtin_help() {
        let mut noop = |_: &Args<'_>, _: &mut dyn Write| {};
        let mut table = CommandTable::new();
        table
            .add_binding(CommandBinding::new("send", "", true, &mut noop))
            .unwrap();

        let mut names = StdVec::new();
        table.for_each_candidate("", &mut |n| names.push(n));
        assert_eq!(names, ["help", "send"]);

        names.clear();
        table.for_each_candidate("se", &mut |n| names.push(n));
        assert_eq!(names, ["send"]);
    }
}
