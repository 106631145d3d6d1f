//! The orchestrator: translates decoded key events into [`Command`]s,
//! drives [`EditSession::dispatch`], writes the resulting plan to the
//! terminal, and surfaces the outcome of a line as a [`LineResult`].

use edgeline_commands::{Command, DispatchError, EditSession, Outcome};
use edgeline_completion::CompletionSource;
use edgeline_config::Config;
use edgeline_cursor::PromptGeometry;
use edgeline_display::Anchor;
use edgeline_grid::TerminalGrid;
use edgeline_history::History;
use edgeline_terminal::{
    CrosstermTerminalIo, IoError, KeyCode, KeyEvent, Modifiers, NamedKey, TerminalGuard, TerminalIO,
};
use std::fmt;

#[derive(Debug)]
pub enum CoreError {
    Io(IoError),
    Dispatch(DispatchError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Io(e) => write!(f, "{e}"),
            CoreError::Dispatch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoreError::Io(e) => Some(e),
            CoreError::Dispatch(e) => Some(e),
        }
    }
}

impl From<IoError> for CoreError {
    fn from(e: IoError) -> Self {
        CoreError::Io(e)
    }
}

impl From<DispatchError> for CoreError {
    fn from(e: DispatchError) -> Self {
        CoreError::Dispatch(e)
    }
}

/// Outcome of reading one complete line from the user.
#[derive(Debug)]
pub enum LineResult {
    Accepted(String),
    Cancelled,
    Eof,
    Error(CoreError),
}

/// Maps a decoded [`KeyEvent`] to an [`Command`], given whether the buffer
/// is currently empty (only relevant to Ctrl-D's EOF-vs-delete behavior).
fn translate_key(key: KeyEvent, buffer_empty: bool) -> Option<Command> {
    use NamedKey::*;

    if key.modifiers.contains(Modifiers::CTRL) {
        if let KeyCode::Char(c) = key.code {
            return match c.to_ascii_lowercase() {
                'a' => Some(Command::MoveHome),
                'e' => Some(Command::MoveEnd),
                'k' => Some(Command::KillToEol),
                'u' => Some(Command::KillToBol),
                'w' => Some(Command::BackspaceWord),
                'c' => Some(Command::CancelLine),
                // Ctrl-D on an empty buffer is EOF, handled by the caller
                // before translate_key is ever reached for that case.
                'd' if !buffer_empty => Some(Command::DeleteForward),
                _ => None,
            };
        }
    }

    match key.code {
        KeyCode::Char(c) => Some(Command::InsertCodepoint(c)),
        KeyCode::Named(Left) => Some(Command::MoveLeft),
        KeyCode::Named(Right) => Some(Command::MoveRight),
        KeyCode::Named(Up) => Some(Command::HistoryUp),
        KeyCode::Named(Down) => Some(Command::HistoryDown),
        KeyCode::Named(Home) => Some(Command::MoveHome),
        KeyCode::Named(End) => Some(Command::MoveEnd),
        KeyCode::Named(Enter) => Some(Command::AcceptLine),
        KeyCode::Named(Backspace) => Some(Command::Backspace),
        KeyCode::Named(Delete) => Some(Command::DeleteForward),
        KeyCode::Named(Tab) => Some(Command::CompleteTab),
        KeyCode::Named(Esc) => Some(Command::CancelLine),
    }
}

/// The top-level session: owns the terminal, the edit session state, and
/// config; runs the synchronous, single-threaded read-eval loop.
pub struct Core<T: TerminalIO> {
    io: T,
    session: EditSession,
    config: Config,
}

impl<T: TerminalIO> Core<T> {
    pub fn new(io: T, config: Config, prompt_last_line_width: usize, history: History) -> Self {
        let (width, height) = io.geometry();
        let grid = TerminalGrid::new(width, height);
        let geometry = PromptGeometry {
            width,
            height: 1,
            last_line_width: prompt_last_line_width,
        };
        let anchor = Anchor { prompt_top: 0, prompt_height: 1 };
        let session = EditSession::new(grid, geometry, anchor, config.editing.tab_width, history);
        Self { io, session, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditSession {
        &mut self.session
    }

    /// Notify the session of a terminal resize.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.session.resize(width, height);
    }

    /// Read and edit a single line to completion (accept, cancel, or EOF).
    pub fn run_line(&mut self, source: &dyn CompletionSource) -> LineResult {
        loop {
            let key = match self.io.read_event() {
                Ok(k) => k,
                Err(IoError::Eof) => return LineResult::Eof,
                Err(e) => return LineResult::Error(CoreError::Io(e)),
            };

            let buffer_empty = self.session.buffer().is_empty();
            let is_ctrl_d = key.modifiers.contains(Modifiers::CTRL)
                && matches!(key.code, KeyCode::Char(c) if c.to_ascii_lowercase() == 'd');
            if is_ctrl_d && buffer_empty {
                return LineResult::Eof;
            }
            let cmd = match translate_key(key, buffer_empty) {
                Some(c) => c,
                None => continue,
            };

            let result = match self.session.dispatch(cmd, source) {
                Ok(r) => r,
                Err(e) => return LineResult::Error(CoreError::Dispatch(e)),
            };

            if !result.write_plan.is_empty() {
                if let Err(e) = self.io.write(&result.write_plan) {
                    return LineResult::Error(CoreError::Io(e));
                }
            }

            match result.outcome {
                Outcome::Accepted(line) => {
                    let _ = self.session.history_mut().add(&line);
                    return LineResult::Accepted(line);
                }
                Outcome::Cancelled => return LineResult::Cancelled,
                Outcome::NoOp | Outcome::Mutated => continue,
            }
        }
    }
}

impl Core<CrosstermTerminalIo> {
    /// Enable raw mode on the underlying terminal, returning an RAII guard
    /// that restores it on drop. Only meaningful for a real TTY backend.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>, IoError> {
        self.io.enter_guard()
    }
}
