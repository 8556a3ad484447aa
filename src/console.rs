//! # Console
//!
//! Line editing and a few commands on top of decoded keystrokes.
//!
//! ## Available Commands
//!
//! - `help`: Display available commands
//! - `info`: Show the timer rate and tick count
//! - `time`: Show uptime
//! - `clear`: Clear the terminal
//!
//! ## Architecture
//!
//! ```text
//! InputQueue ──pop──▶ LineEditor ──Submit──▶ Command::parse ──▶ run
//!                         │                                      │
//!                         └──── echo / erase ────▶ out ◀─────────┘
//! ```
//!
//! Output goes through any [`fmt::Write`]; the kernel hands in the serial
//! port, tests hand in a `String`.

use core::fmt::{self, Write};

use crate::core::interrupts::timer::Timer;

pub const LINE_CAPACITY: usize = 128;
pub const PROMPT: &str = "> ";

const BACKSPACE: u8 = 0x08;
const ERASE_SEQUENCE: &str = "\x08 \x08";
const CLEAR_SEQUENCE: &str = "\x1b[2J\x1b[H";

/// What one keystroke did to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Echo(u8),
    Erase,
    Submit,
    Ignored,
}

/// Fixed buffer holding at most `LINE_CAPACITY - 1` characters. Input past
/// that is dropped, as is backspace on an empty line.
pub struct LineEditor {
    buf: [u8; LINE_CAPACITY],
    len: usize,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    pub const fn new() -> Self {
        LineEditor { buf: [0; LINE_CAPACITY], len: 0 }
    }

    pub fn feed(&mut self, character: u8) -> Edit {
        match character {
            b'\n' => Edit::Submit,
            BACKSPACE if self.len > 0 => {
                self.len -= 1;
                Edit::Erase
            }
            BACKSPACE => Edit::Ignored,
            _ if self.len < LINE_CAPACITY - 1 => {
                self.buf[self.len] = character;
                self.len += 1;
                Edit::Echo(character)
            }
            _ => Edit::Ignored,
        }
    }

    /// The scancode table only yields ASCII, so this is never lossy in
    /// practice.
    pub fn line(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Empty,
    Help,
    Info,
    Time,
    Clear,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Command::Empty,
            "help" => Command::Help,
            "info" => Command::Info,
            "time" => Command::Time,
            "clear" => Command::Clear,
            other => Command::Unknown(other),
        }
    }
}

fn run(command: Command<'_>, timer: &Timer, out: &mut impl Write) -> fmt::Result {
    match command {
        Command::Empty => Ok(()),
        Command::Help => {
            writeln!(out, "Available commands:")?;
            writeln!(out, "  help    - Display this help message")?;
            writeln!(out, "  info    - Display system information")?;
            writeln!(out, "  time    - Display uptime")?;
            writeln!(out, "  clear   - Clear the screen")
        }
        Command::Info => writeln!(out, "Timer: {} Hz, {} ticks", timer.frequency(), timer.ticks()),
        Command::Time => writeln!(out, "System uptime: {}", timer.uptime()),
        Command::Clear => out.write_str(CLEAR_SEQUENCE),
        Command::Unknown(name) => writeln!(out, "Unknown command: {}", name),
    }
}

#[derive(Default)]
pub struct Console {
    editor: LineEditor,
}

impl Console {
    pub const fn new() -> Self {
        Console { editor: LineEditor::new() }
    }

    pub fn start(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "Type 'help' for commands.")?;
        out.write_str(PROMPT)
    }

    /// Applies one character: echo, erase, or run the finished line and
    /// print a fresh prompt.
    pub fn feed(&mut self, character: u8, timer: &Timer, out: &mut impl Write) -> fmt::Result {
        match self.editor.feed(character) {
            Edit::Echo(c) => out.write_char(char::from(c)),
            Edit::Erase => out.write_str(ERASE_SEQUENCE),
            Edit::Ignored => Ok(()),
            Edit::Submit => {
                out.write_char('\n')?;
                let result = run(Command::parse(self.editor.line()), timer, out);
                self.editor.clear();
                result?;
                out.write_str(PROMPT)
            }
        }
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interrupts::pic::ChainedPics;
    use crate::core::interrupts::timer::Divisor;
    use crate::testing::MockMachine;

    fn type_line(console: &mut Console, timer: &Timer, keys: &[u8]) -> String {
        let mut out = String::new();
        for &key in keys {
            console.feed(key, timer, &mut out).expect("string writes never fail");
        }
        out
    }

    #[test]
    fn characters_echo_and_backspace_erases() {
        let mut editor = LineEditor::new();

        assert_eq!(editor.feed(b'h'), Edit::Echo(b'h'));
        assert_eq!(editor.feed(b'x'), Edit::Echo(b'x'));
        assert_eq!(editor.feed(BACKSPACE), Edit::Erase);
        assert_eq!(editor.feed(b'i'), Edit::Echo(b'i'));

        assert_eq!(editor.line(), "hi");
        assert_eq!(editor.feed(b'\n'), Edit::Submit);
    }

    #[test]
    fn backspace_on_empty_line_is_ignored() {
        let mut editor = LineEditor::new();
        assert_eq!(editor.feed(BACKSPACE), Edit::Ignored);
        assert!(editor.is_empty());
    }

    #[test]
    fn line_stops_one_short_of_capacity() {
        let mut editor = LineEditor::new();
        for _ in 0..LINE_CAPACITY - 1 {
            assert_eq!(editor.feed(b'a'), Edit::Echo(b'a'));
        }
        assert_eq!(editor.feed(b'b'), Edit::Ignored);
        assert_eq!(editor.len(), LINE_CAPACITY - 1);
        assert_eq!(editor.feed(BACKSPACE), Edit::Erase);
    }

    #[test]
    fn commands_parse_after_trimming() {
        assert_eq!(Command::parse("  time "), Command::Time);
        assert_eq!(Command::parse("help"), Command::Help);
        assert_eq!(Command::parse("\t"), Command::Empty);
        assert_eq!(Command::parse("reboot"), Command::Unknown("reboot"));
    }

    #[test]
    fn time_reports_uptime_from_ticks() {
        let machine = MockMachine::new();
        let pics = ChainedPics::remapped();
        let timer = Timer::new();
        timer.program(&machine, Divisor::for_frequency(100).expect("valid rate"));
        for _ in 0..6_150 {
            timer.on_interrupt(&machine, &pics);
        }
        let mut console = Console::new();

        let out = type_line(&mut console, &timer, b"time\n");

        assert_eq!(out, "time\nSystem uptime: 1m 1s\n> ");
        assert!(console.editor().is_empty());
    }

    #[test]
    fn unknown_command_is_reported_and_line_reset() {
        let timer = Timer::new();
        let mut console = Console::new();

        let out = type_line(&mut console, &timer, b"foo\x08\x08x\n\n");

        assert_eq!(out, "foo\x08 \x08\x08 \x08x\nUnknown command: fx\n> \n> ");
    }

    #[test]
    fn start_prints_prompt() {
        let mut out = String::new();
        Console::new().start(&mut out).expect("string writes never fail");
        assert!(out.ends_with(PROMPT));
    }
}
