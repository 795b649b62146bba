//! Console backed by the host terminal.

use std::collections::VecDeque;
use std::io::{stdin, stdout, IsTerminal, Read, Write};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEvent},
    terminal,
};

use crate::device::Console;

/// Similar to [`crossterm::event::KeyCode`] but only contains relevant information.
#[derive(Debug)]
pub enum Key {
    Enter,
    Tab,
    Backspace,
    Char(char),
}

/// Must only be called if terminal is NOT in raw mode.
pub fn enable_raw_mode() {
    debug_assert!(
        !terminal::is_raw_mode_enabled().is_ok_and(|is| is),
        "terminal should not be in raw mode to enable raw mode",
    );
    terminal::enable_raw_mode().expect("failed to enable raw terminal");
}

/// Must only be called if terminal is in raw mode.
pub fn disable_raw_mode() {
    debug_assert!(
        terminal::is_raw_mode_enabled().is_ok_and(|is| is),
        "terminal should already be in raw mode to disable raw mode",
    );
    terminal::disable_raw_mode().expect("failed to disable raw terminal");
}

/// Console reading from stdin and writing to stdout.
///
/// When stdin is an interactive terminal, input arrives as key events and
/// the caller is expected to hold the terminal in raw mode for the duration
/// of a run. When stdin is a pipe or file, bytes are read directly and end
/// of input reads as 0.
pub struct TerminalConsole {
    /// Decoded bytes waiting to be handed to the machine. Keys consumed by a
    /// poll and the tail bytes of multi-byte characters land here.
    pending: VecDeque<u8>,
    /// Interactive terminal vs. piped input.
    interactive: bool,
    /// Piped input ran dry.
    eof: bool,
}

impl TerminalConsole {
    pub fn new() -> Self {
        TerminalConsole {
            pending: VecDeque::new(),
            interactive: stdin().is_terminal(),
            eof: false,
        }
    }

    /// Whether the caller should hold the terminal in raw mode while the
    /// machine runs.
    pub fn wants_raw_mode(&self) -> bool {
        self.interactive
    }

    /// Queue the bytes of a key press. Multi-byte characters are encoded as
    /// UTF-8 and handed to the machine one byte at a time.
    fn buffer_key(&mut self, key: Key) {
        let ch = match key {
            Key::Enter => '\n',
            Key::Tab => '\t',
            Key::Backspace => '\u{8}',
            Key::Char(ch) => ch,
        };
        let mut bytes = [0u8; 4];
        self.pending.extend(ch.encode_utf8(&mut bytes).bytes());
    }

    fn read_piped(&mut self) -> u8 {
        let mut buf = [0; 1];
        match stdin().read_exact(&mut buf) {
            Ok(()) => buf[0],
            Err(_) => {
                self.eof = true;
                0
            }
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn poll(&mut self) -> bool {
        if !self.pending.is_empty() {
            return true;
        }
        if !self.interactive {
            return !self.eof;
        }
        // Drain whatever events are already queued without blocking
        while event::poll(Duration::ZERO).is_ok_and(|ready| ready) {
            let event = event::read().expect("failed to read terminal event");
            if let Ok(key) = Key::try_from(event) {
                self.buffer_key(key);
            }
            if !self.pending.is_empty() {
                return true;
            }
        }
        false
    }

    fn read(&mut self) -> u8 {
        if let Some(byte) = self.pending.pop_front() {
            return byte;
        }
        if !self.interactive {
            return self.read_piped();
        }
        loop {
            let event = event::read().expect("failed to read terminal event");
            if let Ok(key) = Key::try_from(event) {
                self.buffer_key(key);
            }
            if let Some(byte) = self.pending.pop_front() {
                return byte;
            }
        }
    }

    fn write(&mut self, byte: u8) {
        let mut out = stdout();
        // Raw mode disables output post-processing; put the carriage
        // return back ourselves.
        if byte == b'\n' && self.interactive {
            out.write_all(b"\r\n").expect("failed to write to stdout");
        } else {
            out.write_all(&[byte]).expect("failed to write to stdout");
        }
        out.flush().expect("failed to flush stdout");
    }
}

impl TryFrom<Event> for Key {
    type Error = ();
    fn try_from(event: Event) -> Result<Self, Self::Error> {
        if let Event::Key(event) = event {
            if let Ok(key) = event.try_into() {
                return Ok(key);
            }
        }
        Err(())
    }
}

impl TryFrom<KeyEvent> for Key {
    type Error = ();
    fn try_from(event: KeyEvent) -> Result<Self, Self::Error> {
        use event::{KeyCode, KeyEventKind, KeyModifiers as Mod};

        if matches!(event.kind, KeyEventKind::Release) {
            return Err(());
        }

        let key = match (event.modifiers, event.code) {
            // Ctrl+C
            (Mod::CONTROL, KeyCode::Char('c')) => {
                disable_raw_mode(); // Generic cleanup
                println!();
                std::process::exit(0);
            }

            (_, KeyCode::Backspace) => Key::Backspace,
            (_, KeyCode::Tab) => Key::Tab,
            (_, KeyCode::Enter) | (_, KeyCode::Char('\n')) => Key::Enter,

            // Normal character
            (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) => Key::Char(ch),

            _ => return Err(()),
        };

        Ok(key)
    }
}
