//! The terminal edge: a neutral key-event model, the `TerminalIO` trait the
//! core consumes, and a crossterm-backed raw-mode implementation of it.
//!
//! The core crate depends only on [`TerminalIO`] and [`KeyEvent`] — never on
//! `crossterm` directly. [`CrosstermTerminalIo`] is the concrete adapter an
//! embedder plugs in; translating crossterm's own key event type into this
//! crate's neutral one happens privately inside that adapter.

use std::fmt;
use std::io::{self, Write as _};

/// A named, non-printable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Enter,
    Backspace,
    Delete,
    Tab,
    Esc,
}

/// The payload of a decoded key press: either a printable codepoint or a
/// named key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Named(NamedKey),
}

bitflags::bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const NONE = 0;
        const CTRL = 0b001;
        const ALT = 0b010;
        const SHIFT = 0b100;
    }
}

/// A decoded key press, independent of any particular terminal library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn plain(code: KeyCode) -> Self {
        Self { code, modifiers: Modifiers::NONE }
    }

    pub fn ctrl(c: char) -> Self {
        Self { code: KeyCode::Char(c), modifiers: Modifiers::CTRL }
    }
}

/// I/O failure surfaced from a [`TerminalIO`] implementation.
#[derive(Debug)]
pub enum IoError {
    Read(io::Error),
    Write(io::Error),
    Eof,
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Read(e) => write!(f, "terminal read failed: {e}"),
            IoError::Write(e) => write!(f, "terminal write failed: {e}"),
            IoError::Eof => f.write_str("terminal input reached end of file"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::Read(e) | IoError::Write(e) => Some(e),
            IoError::Eof => None,
        }
    }
}

/// The terminal-facing surface the core depends on. Consumed, never
/// implemented, by the core crate — implementations live at the edge.
pub trait TerminalIO {
    /// Block for the next key event. Returns `Err(IoError::Eof)` when input
    /// is exhausted (e.g. piped stdin closed).
    fn read_event(&mut self) -> Result<KeyEvent, IoError>;
    /// Write bytes opaquely; never interpreted.
    fn write(&mut self, bytes: &[u8]) -> Result<(), IoError>;
    /// Current terminal dimensions, `(width, height)` in cells.
    fn geometry(&self) -> (usize, usize);
    /// Best-effort cursor query. Implementations that cannot reliably query
    /// the real cursor (most raw-mode TTYs) must return `None`; the core
    /// never relies on this for correctness.
    fn query_cursor(&mut self) -> Option<(usize, usize)> {
        None
    }
}

/// crossterm-backed implementation of [`TerminalIO`] for a real TTY.
pub struct CrosstermTerminalIo {
    entered: bool,
}

impl Default for CrosstermTerminalIo {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermTerminalIo {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Enable raw mode and return an RAII guard that restores the terminal
    /// on drop, even on an early return or panic.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>, IoError> {
        self.enter()?;
        Ok(TerminalGuard { io: self, active: true })
    }

    fn enter(&mut self) -> Result<(), IoError> {
        if !self.entered {
            crossterm::terminal::enable_raw_mode().map_err(IoError::Write)?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<(), IoError> {
        if self.entered {
            crossterm::terminal::disable_raw_mode().map_err(IoError::Write)?;
            self.entered = false;
        }
        Ok(())
    }

    fn translate(event: crossterm::event::KeyEvent) -> Option<KeyEvent> {
        use crossterm::event::{KeyCode as CtKeyCode, KeyModifiers as CtModifiers};

        let mut modifiers = Modifiers::NONE;
        if event.modifiers.contains(CtModifiers::CONTROL) {
            modifiers |= Modifiers::CTRL;
        }
        if event.modifiers.contains(CtModifiers::ALT) {
            modifiers |= Modifiers::ALT;
        }
        if event.modifiers.contains(CtModifiers::SHIFT) {
            modifiers |= Modifiers::SHIFT;
        }

        let code = match event.code {
            CtKeyCode::Char(c) => KeyCode::Char(c),
            CtKeyCode::Left => KeyCode::Named(NamedKey::Left),
            CtKeyCode::Right => KeyCode::Named(NamedKey::Right),
            CtKeyCode::Up => KeyCode::Named(NamedKey::Up),
            CtKeyCode::Down => KeyCode::Named(NamedKey::Down),
            CtKeyCode::Home => KeyCode::Named(NamedKey::Home),
            CtKeyCode::End => KeyCode::Named(NamedKey::End),
            CtKeyCode::Enter => KeyCode::Named(NamedKey::Enter),
            CtKeyCode::Backspace => KeyCode::Named(NamedKey::Backspace),
            CtKeyCode::Delete => KeyCode::Named(NamedKey::Delete),
            CtKeyCode::Tab => KeyCode::Named(NamedKey::Tab),
            CtKeyCode::Esc => KeyCode::Named(NamedKey::Esc),
            _ => return None,
        };
        Some(KeyEvent { code, modifiers })
    }
}

impl TerminalIO for CrosstermTerminalIo {
    fn read_event(&mut self) -> Result<KeyEvent, IoError> {
        loop {
            let event = crossterm::event::read().map_err(IoError::Read)?;
            if let crossterm::event::Event::Key(key) = event {
                if key.kind == crossterm::event::KeyEventKind::Press {
                    if let Some(translated) = Self::translate(key) {
                        return Ok(translated);
                    }
                }
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let mut stdout = io::stdout();
        stdout.write_all(bytes).map_err(IoError::Write)?;
        stdout.flush().map_err(IoError::Write)
    }

    fn geometry(&self) -> (usize, usize) {
        crossterm::terminal::size()
            .map(|(w, h)| (w as usize, h as usize))
            .unwrap_or((80, 24))
    }

    fn query_cursor(&mut self) -> Option<(usize, usize)> {
        None
    }
}

impl Drop for CrosstermTerminalIo {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

/// RAII guard restoring terminal state on drop; mirrors the discipline of
/// pairing raw-mode entry with a guaranteed exit.
pub struct TerminalGuard<'a> {
    io: &'a mut CrosstermTerminalIo,
    active: bool,
}

impl<'a> Drop for TerminalGuard<'a> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.io.leave();
        }
    }
}
