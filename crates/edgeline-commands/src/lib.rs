//! The command set a line editor session understands, and the dispatcher
//! that turns each command into a buffer mutation plus a display write
//! plan.
//!
//! [`EditSession`] owns every piece of mutable state a session needs
//! (buffer, grid, display reconciler, history, completion) so the embedder
//! only has to hold one value and call [`EditSession::dispatch`] per
//! incoming command.

use edgeline_completion::{CompletionSession, CompletionSource};
use edgeline_cursor::PromptGeometry;
use edgeline_display::{Anchor, DisplayError, DisplaySync, Intent};
use edgeline_grid::TerminalGrid;
use edgeline_history::{History, HistoryError};
use edgeline_text::{EditOutcome, TextBuffer, TextError};
use std::fmt;

/// Every action a key press (or an external signal) can resolve to.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    InsertCodepoint(char),
    DeleteForward,
    Backspace,
    MoveLeft,
    MoveRight,
    MoveWordLeft,
    MoveWordRight,
    MoveHome,
    MoveEnd,
    SetCursor(usize),
    KillToEol,
    KillToBol,
    DeleteWord,
    BackspaceWord,
    ClearLine,
    ReplaceLine(Vec<u8>),
    AcceptLine,
    CancelLine,
    HistoryUp,
    HistoryDown,
    CompleteTab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    Text(TextError),
    Display(DisplayError),
    History(HistoryError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Text(e) => write!(f, "text buffer error: {e}"),
            DispatchError::Display(e) => write!(f, "display reconciliation error: {e}"),
            DispatchError::History(e) => write!(f, "history error: {e}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Text(e) => Some(e),
            DispatchError::Display(e) => Some(e),
            DispatchError::History(e) => Some(e),
        }
    }
}

impl From<TextError> for DispatchError {
    fn from(e: TextError) -> Self {
        DispatchError::Text(e)
    }
}

impl From<DisplayError> for DispatchError {
    fn from(e: DisplayError) -> Self {
        DispatchError::Display(e)
    }
}

/// Result of dispatching a single command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NoOp,
    Mutated,
    Accepted(String),
    Cancelled,
}

/// The outcome of a dispatched command plus the bytes to send to the
/// terminal to reflect it.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub outcome: Outcome,
    pub write_plan: Vec<u8>,
}

/// The buffer × navigation × completion state machine (§4.7 in spirit).
#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Editing,
    NavigatingHistory { draft: String },
    Completing,
}

/// Owns every mutable piece of a single edit session: the text being
/// edited, the mirrored terminal grid, the display reconciler, history, and
/// the active completion cycle.
pub struct EditSession {
    buffer: TextBuffer,
    grid: TerminalGrid,
    sync: DisplaySync,
    geometry: PromptGeometry,
    anchor: Anchor,
    tab_width: u8,
    history: History,
    completion: CompletionSession,
    mode: Mode,
}

impl EditSession {
    pub fn new(grid: TerminalGrid, geometry: PromptGeometry, anchor: Anchor, tab_width: u8, history: History) -> Self {
        Self {
            buffer: TextBuffer::new(),
            grid,
            sync: DisplaySync::new(),
            geometry,
            anchor,
            tab_width,
            history,
            completion: CompletionSession::new(),
            mode: Mode::Editing,
        }
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.grid.resize(width, height);
    }

    pub fn set_geometry(&mut self, geometry: PromptGeometry) {
        self.geometry = geometry;
    }

    fn reconcile(&mut self, intent: Intent) -> Result<Vec<u8>, DispatchError> {
        let bytes = self.buffer.as_str().as_bytes().to_vec();
        let plan = self.sync.reconcile(
            &bytes,
            self.buffer.cursor_byte(),
            &self.geometry,
            self.tab_width,
            self.anchor,
            &mut self.grid,
            intent,
        )?;
        Ok(plan)
    }

    fn leave_navigation_if_needed(&mut self) {
        if matches!(self.mode, Mode::NavigatingHistory { .. }) {
            self.mode = Mode::Editing;
        }
    }

    fn leave_completion_if_needed(&mut self, cmd: &Command) {
        if !matches!(cmd, Command::CompleteTab) && matches!(self.mode, Mode::Completing) {
            self.completion.clear();
            self.mode = Mode::Editing;
        }
    }

    /// Dispatch one command: mutate state, choose a reconcile intent, and
    /// return the write plan plus a classification of what happened.
    pub fn dispatch(&mut self, cmd: Command, source: &dyn CompletionSource) -> Result<DispatchResult, DispatchError> {
        self.leave_completion_if_needed(&cmd);

        let result = match cmd {
            Command::InsertCodepoint(cp) => self.insert_codepoint(cp)?,
            Command::DeleteForward => self.delete_forward()?,
            Command::Backspace => self.backspace()?,
            Command::MoveLeft => self.cursor_only(|b| b.move_left())?,
            Command::MoveRight => self.cursor_only(|b| b.move_right())?,
            Command::MoveWordLeft => self.cursor_only(|b| b.move_word_left())?,
            Command::MoveWordRight => self.cursor_only(|b| b.move_word_right())?,
            Command::MoveHome => self.cursor_only(|b| b.move_home())?,
            Command::MoveEnd => self.cursor_only(|b| b.move_end())?,
            Command::SetCursor(n) => self.set_cursor(n)?,
            Command::KillToEol => self.kill_to_eol()?,
            Command::KillToBol => self.kill_to_bol()?,
            Command::DeleteWord => self.delete_word()?,
            Command::BackspaceWord => self.backspace_word()?,
            Command::ClearLine => self.replace_line(Vec::new())?,
            Command::ReplaceLine(bytes) => self.replace_line(bytes)?,
            Command::AcceptLine => self.accept_line()?,
            Command::CancelLine => self.cancel_line()?,
            Command::HistoryUp => self.history_up()?,
            Command::HistoryDown => self.history_down()?,
            Command::CompleteTab => self.complete_tab(source)?,
        };

        tracing::trace!(target: "edgeline::commands", outcome = ?result.outcome, "command dispatched");
        Ok(result)
    }

    fn cursor_only(&mut self, f: impl FnOnce(&mut TextBuffer) -> EditOutcome) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        match f(&mut self.buffer) {
            EditOutcome::NoOp => Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() }),
            EditOutcome::Mutated => {
                let plan = self.reconcile(Intent::CursorOnly)?;
                Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
            }
        }
    }

    fn insert_codepoint(&mut self, cp: char) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        let pos = self.buffer.cursor_byte();
        self.buffer.insert_codepoint(cp)?;
        let plan = self.reconcile(Intent::InsertAt { pos })?;
        Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
    }

    fn delete_forward(&mut self) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        let pos = self.buffer.cursor_byte();
        match self.buffer.delete_forward() {
            EditOutcome::NoOp => Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() }),
            EditOutcome::Mutated => {
                let plan = self.reconcile(Intent::DeleteAt { pos, removed_len: 0 })?;
                Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
            }
        }
    }

    fn backspace(&mut self) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        match self.buffer.backspace() {
            EditOutcome::NoOp => Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() }),
            EditOutcome::Mutated => {
                let pos = self.buffer.cursor_byte();
                let plan = self.reconcile(Intent::DeleteAt { pos, removed_len: 0 })?;
                Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
            }
        }
    }

    fn set_cursor(&mut self, n: usize) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        match self.buffer.set_cursor_byte(n) {
            Ok(()) => {
                let plan = self.reconcile(Intent::CursorOnly)?;
                Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
            }
            Err(TextError::OutOfBounds) | Err(TextError::NonBoundary) => {
                Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn kill_to_eol(&mut self) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        let pos = self.buffer.cursor_byte();
        let len = self.buffer.len();
        if pos == len {
            return Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() });
        }
        self.buffer.delete_range(pos, len)?;
        let plan = self.reconcile(Intent::DeleteAt { pos, removed_len: len - pos })?;
        Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
    }

    fn kill_to_bol(&mut self) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        let pos = self.buffer.cursor_byte();
        if pos == 0 {
            return Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() });
        }
        self.buffer.delete_range(0, pos)?;
        self.buffer.set_cursor_byte(0)?;
        let plan = self.reconcile(Intent::DeleteAt { pos: 0, removed_len: pos })?;
        Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
    }

    fn delete_word(&mut self) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        let start = self.buffer.cursor_byte();
        let mut probe = self.buffer.clone();
        probe.move_word_right();
        let end = probe.cursor_byte();
        if end == start {
            return Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() });
        }
        self.buffer.delete_range(start, end)?;
        let plan = self.reconcile(Intent::DeleteAt { pos: start, removed_len: end - start })?;
        Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
    }

    fn backspace_word(&mut self) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        let end = self.buffer.cursor_byte();
        let mut probe = self.buffer.clone();
        probe.move_word_left();
        let start = probe.cursor_byte();
        if start == end {
            return Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() });
        }
        self.buffer.delete_range(start, end)?;
        let plan = self.reconcile(Intent::DeleteAt { pos: start, removed_len: end - start })?;
        Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
    }

    fn replace_line(&mut self, bytes: Vec<u8>) -> Result<DispatchResult, DispatchError> {
        self.buffer.clear();
        self.buffer.insert_slice(&bytes)?;
        let plan = self.reconcile(Intent::ReplaceAll)?;
        Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
    }

    fn accept_line(&mut self) -> Result<DispatchResult, DispatchError> {
        self.mode = Mode::Editing;
        self.completion.clear();
        self.history.nav_end();
        let line = self.buffer.as_str().to_string();
        self.buffer.clear();
        let mut plan = self.reconcile(Intent::ReplaceAll)?;
        plan.extend_from_slice(b"\r\n");
        Ok(DispatchResult { outcome: Outcome::Accepted(line), write_plan: plan })
    }

    fn cancel_line(&mut self) -> Result<DispatchResult, DispatchError> {
        self.mode = Mode::Editing;
        self.completion.clear();
        self.history.nav_end();
        self.buffer.clear();
        let plan = self.reconcile(Intent::ReplaceAll)?;
        Ok(DispatchResult { outcome: Outcome::Cancelled, write_plan: plan })
    }

    fn history_up(&mut self) -> Result<DispatchResult, DispatchError> {
        let was_editing = matches!(self.mode, Mode::Editing);
        let draft = was_editing.then(|| self.buffer.as_str().to_string());
        if was_editing {
            self.history.nav_start();
        }
        match self.history.nav_up() {
            Some(entry) => {
                if was_editing {
                    self.mode = Mode::NavigatingHistory { draft: draft.unwrap_or_default() };
                }
                let bytes = entry.as_bytes().to_vec();
                self.replace_line(bytes)
            }
            None => Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() }),
        }
    }

    fn history_down(&mut self) -> Result<DispatchResult, DispatchError> {
        match self.history.nav_down() {
            Some(entry) => {
                let bytes = entry.as_bytes().to_vec();
                self.replace_line(bytes)
            }
            None => {
                let draft = match std::mem::replace(&mut self.mode, Mode::Editing) {
                    Mode::NavigatingHistory { draft } => draft,
                    other => {
                        self.mode = other;
                        return Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() });
                    }
                };
                self.replace_line(draft.into_bytes())
            }
        }
    }

    fn complete_tab(&mut self, source: &dyn CompletionSource) -> Result<DispatchResult, DispatchError> {
        self.leave_navigation_if_needed();
        let line = self.buffer.as_str().as_bytes().to_vec();
        let cursor = self.buffer.cursor_byte();
        match self.completion.on_tab(&line, cursor, source) {
            Some(app) => {
                self.mode = Mode::Completing;
                self.buffer.delete_range(app.replace_start, app.replace_end)?;
                self.buffer.set_cursor_byte(app.replace_start)?;
                self.buffer.insert_slice(app.text.as_bytes())?;
                let plan = self.reconcile(Intent::ReplaceAll)?;
                Ok(DispatchResult { outcome: Outcome::Mutated, write_plan: plan })
            }
            None => {
                self.mode = Mode::Editing;
                Ok(DispatchResult { outcome: Outcome::NoOp, write_plan: Vec::new() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeline_completion::{Candidate, CompletionKind};
    use edgeline_history::HistoryPolicy;

    struct NoCompletion;
    impl CompletionSource for NoCompletion {
        fn complete(&self, _kind: CompletionKind, _prefix: &str) -> Vec<Candidate> {
            Vec::new()
        }
    }

    fn session() -> EditSession {
        let grid = TerminalGrid::new(40, 5);
        let geometry = PromptGeometry { width: 40, height: 1, last_line_width: 2 };
        let anchor = Anchor { prompt_top: 0, prompt_height: 1 };
        let history = History::new(16, HistoryPolicy::default()).unwrap();
        EditSession::new(grid, geometry, anchor, 8, history)
    }

    #[test]
    fn insert_and_accept_round_trip() {
        let mut s = session();
        let source = NoCompletion;
        s.dispatch(Command::InsertCodepoint('h'), &source).unwrap();
        s.dispatch(Command::InsertCodepoint('i'), &source).unwrap();
        let r = s.dispatch(Command::AcceptLine, &source).unwrap();
        assert_eq!(r.outcome, Outcome::Accepted("hi".to_string()));
        assert_eq!(s.buffer().len(), 0);
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut s = session();
        let source = NoCompletion;
        let r = s.dispatch(Command::Backspace, &source).unwrap();
        assert_eq!(r.outcome, Outcome::NoOp);
    }

    #[test]
    fn kill_to_eol_and_bol() {
        let mut s = session();
        let source = NoCompletion;
        s.dispatch(Command::ReplaceLine(b"hello world".to_vec()), &source).unwrap();
        s.dispatch(Command::SetCursor(5), &source).unwrap();
        s.dispatch(Command::KillToEol, &source).unwrap();
        assert_eq!(s.buffer().as_str(), "hello");
        s.dispatch(Command::KillToBol, &source).unwrap();
        assert_eq!(s.buffer().as_str(), "");
    }

    #[test]
    fn history_up_then_down_restores_draft() {
        let mut s = session();
        let source = NoCompletion;
        s.history_mut().add("first command").unwrap();
        s.dispatch(Command::InsertCodepoint('x'), &source).unwrap();
        s.dispatch(Command::HistoryUp, &source).unwrap();
        assert_eq!(s.buffer().as_str(), "first command");
        s.dispatch(Command::HistoryDown, &source).unwrap();
        assert_eq!(s.buffer().as_str(), "x");
    }

    #[test]
    fn history_up_on_empty_history_is_noop() {
        let mut s = session();
        let source = NoCompletion;
        s.dispatch(Command::InsertCodepoint('x'), &source).unwrap();
        let r = s.dispatch(Command::HistoryUp, &source).unwrap();
        assert_eq!(r.outcome, Outcome::NoOp);
        assert_eq!(s.buffer().as_str(), "x");
        // A stray draft must not have been stashed: HistoryDown is also a noop.
        let r = s.dispatch(Command::HistoryDown, &source).unwrap();
        assert_eq!(r.outcome, Outcome::NoOp);
        assert_eq!(s.buffer().as_str(), "x");
    }

    #[test]
    fn cancel_line_clears_buffer() {
        let mut s = session();
        let source = NoCompletion;
        s.dispatch(Command::InsertCodepoint('a'), &source).unwrap();
        let r = s.dispatch(Command::CancelLine, &source).unwrap();
        assert_eq!(r.outcome, Outcome::Cancelled);
        assert_eq!(s.buffer().len(), 0);
    }

    #[test]
    fn delete_word_and_backspace_word() {
        let mut s = session();
        let source = NoCompletion;
        s.dispatch(Command::ReplaceLine(b"foo bar".to_vec()), &source).unwrap();
        s.dispatch(Command::SetCursor(0), &source).unwrap();
        s.dispatch(Command::DeleteWord, &source).unwrap();
        assert_eq!(s.buffer().as_str(), " bar");
        s.dispatch(Command::SetCursor(s.buffer().len()), &source).unwrap();
        s.dispatch(Command::BackspaceWord, &source).unwrap();
        assert_eq!(s.buffer().as_str(), " ");
    }
}
