//! Tab-completion: word extraction, candidate sourcing, and the session
//! state machine that turns repeated Tab presses into cycling through
//! candidates.
//!
//! This crate defines the [`CompletionSource`] trait but ships no
//! implementation of it — a filesystem-backed source is the embedder's
//! concern (see the demo binary's `fs_completion` module).

use std::fmt;

const SEPARATORS: &[u8] = b" \t|&;()<>\"'`$#\0";

/// What kind of thing is being completed, inferred from surrounding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Command,
    Variable,
    Path,
    File,
}

/// A single completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub is_dir: bool,
}

/// Supplies completion candidates for a given kind and prefix. Implemented
/// by the embedder (e.g. a filesystem-backed source); the core only calls
/// through this trait.
pub trait CompletionSource {
    fn complete(&self, kind: CompletionKind, prefix: &str) -> Vec<Candidate>;
}

fn is_separator(b: u8) -> bool {
    b.is_ascii_whitespace() || SEPARATORS.contains(&b)
}

/// Expand leftwards and rightwards from `cursor` over non-separator bytes,
/// returning the `[word_start, word_end)` replacement span.
pub fn extract_word(line: &[u8], cursor: usize) -> (usize, usize) {
    let cursor = cursor.min(line.len());
    let mut start = cursor;
    while start > 0 && !is_separator(line[start - 1]) {
        start -= 1;
    }
    let mut end = cursor;
    while end < line.len() && !is_separator(line[end]) {
        end += 1;
    }
    (start, end)
}

/// Classify the word at `[word_start, word_end)` within `line`.
pub fn detect_kind(line: &[u8], word_start: usize, word_end: usize) -> CompletionKind {
    let span = &line[word_start..word_end];

    let first_non_ws = line.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(0);
    if word_start == first_non_ws {
        return CompletionKind::Command;
    }
    if word_start > 0 && line[word_start - 1] == b'$' {
        return CompletionKind::Variable;
    }
    if span.first() == Some(&b'~') || span.first() == Some(&b'.') || span.contains(&b'/') {
        return CompletionKind::Path;
    }
    CompletionKind::File
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionError {
    NoCandidates,
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no completion candidates available")
    }
}

impl std::error::Error for CompletionError {}

/// The outcome of applying a completion: how to mutate the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub replace_start: usize,
    pub replace_end: usize,
    pub text: String,
}

/// Tracks an in-progress Tab-completion cycle.
#[derive(Debug, Clone)]
pub struct CompletionSession {
    active: bool,
    word_start: usize,
    word_end: usize,
    original_word: String,
    candidates: Vec<Candidate>,
    index: usize,
    kind: Option<CompletionKind>,
}

impl Default for CompletionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSession {
    pub fn new() -> Self {
        Self {
            active: false,
            word_start: 0,
            word_end: 0,
            original_word: String::new(),
            candidates: Vec::new(),
            index: 0,
            kind: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn kind(&self) -> Option<CompletionKind> {
        self.kind
    }

    pub fn total(&self) -> usize {
        self.candidates.len()
    }

    fn same_region(&self, word_start: usize, cursor: usize) -> bool {
        if !self.active || self.word_start != word_start {
            return false;
        }
        cursor >= self.word_start && cursor <= self.word_end
    }

    fn sort_candidates(candidates: &mut [Candidate]) {
        candidates.sort_by(|a, b| a.text.cmp(&b.text).then_with(|| b.is_dir.cmp(&a.is_dir)));
    }

    /// Handle a Tab press at `cursor` within `line`. Returns the buffer
    /// mutation to apply, or `None` if there are no candidates.
    pub fn on_tab(&mut self, line: &[u8], cursor: usize, source: &dyn CompletionSource) -> Option<Application> {
        let (word_start, word_end) = extract_word(line, cursor);

        if self.same_region(word_start, cursor) {
            if self.candidates.len() <= 1 {
                self.clear();
                return None;
            }
            self.index = (self.index + 1) % self.candidates.len();
            let text = self.candidates[self.index].text.clone();
            let replace_end = self.word_end;
            self.word_end = self.word_start + text.len();
            tracing::trace!(target: "edgeline::completion", index = self.index, "cycled completion");
            return Some(Application {
                replace_start: self.word_start,
                replace_end,
                text,
            });
        }

        let kind = detect_kind(line, word_start, word_end);
        let prefix = std::str::from_utf8(&line[word_start..word_end]).unwrap_or("");
        let mut candidates = source.complete(kind, prefix);
        if candidates.is_empty() {
            self.clear();
            return None;
        }
        Self::sort_candidates(&mut candidates);

        self.active = true;
        self.word_start = word_start;
        self.original_word = prefix.to_string();
        self.kind = Some(kind);
        self.index = 0;
        let text = candidates[0].text.clone();
        self.word_end = word_start + text.len();
        self.candidates = candidates;
        tracing::trace!(target: "edgeline::completion", kind = ?kind, total = self.candidates.len(), "started completion session");

        Some(Application {
            replace_start: word_start,
            replace_end: word_end,
            text,
        })
    }

    /// Any command other than Tab clears the active session.
    pub fn clear(&mut self) {
        self.active = false;
        self.word_start = 0;
        self.word_end = 0;
        self.original_word.clear();
        self.candidates.clear();
        self.index = 0;
        self.kind = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<Candidate>);
    impl CompletionSource for FixedSource {
        fn complete(&self, _kind: CompletionKind, _prefix: &str) -> Vec<Candidate> {
            self.0.clone()
        }
    }

    #[test]
    fn extract_word_basic() {
        let line = b"echo hello world";
        assert_eq!(extract_word(line, 7), (5, 10));
        assert_eq!(extract_word(line, 0), (0, 4));
        assert_eq!(extract_word(line, line.len()), (11, 16));
    }

    #[test]
    fn detect_kind_command_variable_path_file() {
        let line = b"echo $HOME ./rel a/b plain";
        assert_eq!(detect_kind(line, 0, 4), CompletionKind::Command);
        assert_eq!(detect_kind(line, 6, 10), CompletionKind::Variable);
        assert_eq!(detect_kind(line, 11, 16), CompletionKind::Path);
        assert_eq!(detect_kind(line, 17, 20), CompletionKind::Path);
        assert_eq!(detect_kind(line, 21, 26), CompletionKind::File);
    }

    #[test]
    fn on_tab_starts_session_and_applies_first_candidate() {
        let source = FixedSource(vec![
            Candidate { text: "banana".into(), is_dir: false },
            Candidate { text: "apple".into(), is_dir: false },
        ]);
        let mut session = CompletionSession::new();
        let line = b"cat a";
        let app = session.on_tab(line, 5, &source).unwrap();
        assert_eq!(app.text, "apple"); // sorted lexicographically
        assert!(session.is_active());
        assert_eq!(session.total(), 2);
    }

    #[test]
    fn second_tab_in_region_cycles() {
        let source = FixedSource(vec![
            Candidate { text: "apple".into(), is_dir: false },
            Candidate { text: "avocado".into(), is_dir: false },
        ]);
        let mut session = CompletionSession::new();
        let line = b"cat a";
        let first = session.on_tab(line, 5, &source).unwrap();
        assert_eq!(first.text, "apple");
        let cursor_after = first.replace_start + first.text.len();
        let line2 = b"cat apple";
        let second = session.on_tab(line2, cursor_after, &source).unwrap();
        assert_eq!(second.text, "avocado");
    }

    #[test]
    fn single_candidate_wrap_ends_session() {
        let source = FixedSource(vec![Candidate { text: "only".into(), is_dir: false }]);
        let mut session = CompletionSession::new();
        let line = b"cat o";
        let first = session.on_tab(line, 5, &source).unwrap();
        assert_eq!(first.text, "only");
        let cursor_after = first.replace_start + first.text.len();
        let line2 = b"cat only";
        assert!(session.on_tab(line2, cursor_after, &source).is_none());
        assert!(!session.is_active());
    }

    #[test]
    fn no_candidates_returns_none() {
        let source = FixedSource(vec![]);
        let mut session = CompletionSession::new();
        assert!(session.on_tab(b"cat x", 5, &source).is_none());
        assert!(!session.is_active());
    }

    #[test]
    fn sort_is_lexicographic_first() {
        let mut candidates = vec![
            Candidate { text: "zzz".into(), is_dir: true },
            Candidate { text: "aaa".into(), is_dir: false },
        ];
        CompletionSession::sort_candidates(&mut candidates);
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["aaa", "zzz"]);
    }

    #[test]
    fn directories_break_ties_at_equal_text() {
        let mut candidates = vec![
            Candidate { text: "bin".into(), is_dir: false },
            Candidate { text: "bin".into(), is_dir: true },
        ];
        CompletionSession::sort_candidates(&mut candidates);
        assert!(candidates[0].is_dir);
        assert!(!candidates[1].is_dir);
    }

    #[test]
    fn clear_resets_session() {
        let source = FixedSource(vec![Candidate { text: "x".into(), is_dir: false }]);
        let mut session = CompletionSession::new();
        session.on_tab(b"echo x", 6, &source);
        session.clear();
        assert!(!session.is_active());
        assert_eq!(session.total(), 0);
    }
}
