//! A fixed-capacity ring of shell history entries, with substring search
//! and plain-text file persistence.

use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch.
pub type UnixSeconds = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub line: String,
    pub timestamp: UnixSeconds,
    pub global_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    NotInitialized,
    InvalidSize,
    AllocFailed,
    FileOpen,
    FileRead,
    FileWrite,
    LineTooLong,
    Empty,
    NotFound,
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            HistoryError::NotInitialized => "history was not initialized with a nonzero capacity",
            HistoryError::InvalidSize => "requested history capacity is invalid",
            HistoryError::AllocFailed => "failed to allocate history storage",
            HistoryError::FileOpen => "failed to open history file",
            HistoryError::FileRead => "failed to read history file",
            HistoryError::FileWrite => "failed to write history file",
            HistoryError::LineTooLong => "history line exceeds the configured maximum length",
            HistoryError::Empty => "history is empty",
            HistoryError::NotFound => "no matching history entry",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for HistoryError {}

/// Outcome of a search step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchState {
    position: usize,
}

/// Policy knobs governing what `add` accepts.
#[derive(Debug, Clone, Copy)]
pub struct HistoryPolicy {
    pub ignore_duplicates: bool,
    pub ignore_space: bool,
    pub max_line_bytes: usize,
    pub case_sensitive: bool,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            ignore_duplicates: true,
            ignore_space: true,
            max_line_bytes: 8192,
            case_sensitive: true,
        }
    }
}

/// A fixed-capacity ring buffer of [`HistoryEntry`], newest-logically-first.
#[derive(Debug)]
pub struct History {
    capacity: usize,
    entries: Vec<Option<HistoryEntry>>,
    head: usize,
    count: usize,
    next_global_index: u32,
    policy: HistoryPolicy,
    nav_cursor: Option<usize>,
    search_pattern: Option<String>,
    search: Option<SearchState>,
}

impl History {
    /// Create a history ring with the given capacity and policy.
    ///
    /// Fails with [`HistoryError::InvalidSize`] if `capacity == 0`.
    pub fn new(capacity: usize, policy: HistoryPolicy) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::InvalidSize);
        }
        Ok(Self {
            capacity,
            entries: vec![None; capacity],
            head: 0,
            count: 0,
            next_global_index: 0,
            policy,
            nav_cursor: None,
            search_pattern: None,
            search: None,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn most_recent_slot(&self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        Some((self.head + self.count - 1) % self.capacity)
    }

    /// Logical index `0` is newest; increasing index walks backward in time.
    pub fn get(&self, i: usize) -> Option<&HistoryEntry> {
        if i >= self.count {
            return None;
        }
        let most_recent = self.most_recent_slot()?;
        let slot = (most_recent + self.capacity - i) % self.capacity;
        self.entries[slot].as_ref()
    }

    fn newest(&self) -> Option<&HistoryEntry> {
        self.most_recent_slot().and_then(|slot| self.entries[slot].as_ref())
    }

    /// Append `line` to history, applying the configured dedup/ignore-space
    /// rules. Returns `Ok(None)` (not an error) when the line was dropped by
    /// policy, and `Ok(Some(global_index))` when it was stored.
    pub fn add(&mut self, line: &str) -> Result<Option<u32>, HistoryError> {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            return Ok(None);
        }
        if trimmed.len() > self.policy.max_line_bytes {
            return Err(HistoryError::LineTooLong);
        }
        if self.policy.ignore_space && trimmed.starts_with(' ') {
            return Ok(None);
        }
        if self.policy.ignore_duplicates {
            if let Some(newest) = self.newest() {
                if newest.line == trimmed {
                    return Ok(None);
                }
            }
        }

        let global_index = self.next_global_index;
        self.next_global_index += 1;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let entry = HistoryEntry {
            line: trimmed.to_string(),
            timestamp,
            global_index,
        };

        if self.count < self.capacity {
            let slot = (self.head + self.count) % self.capacity;
            self.entries[slot] = Some(entry);
            self.count += 1;
        } else {
            self.entries[self.head] = Some(entry);
            self.head = (self.head + 1) % self.capacity;
        }
        tracing::trace!(target: "edgeline::history", global_index, "history entry added");
        Ok(Some(global_index))
    }

    /// Begin an up/down navigation session. The next `nav_up()` call lands
    /// on the newest entry.
    pub fn nav_start(&mut self) {
        self.nav_cursor = None;
    }

    /// Move to an older entry; returns its text, or `None` at the oldest.
    pub fn nav_up(&mut self) -> Option<&str> {
        let next = match self.nav_cursor {
            Some(i) => i + 1,
            None => 0,
        };
        if next >= self.count {
            return None;
        }
        self.nav_cursor = Some(next);
        self.get(next).map(|e| e.line.as_str())
    }

    /// Move to a newer entry; returns its text, or `None` once past newest
    /// (navigation ends).
    pub fn nav_down(&mut self) -> Option<&str> {
        match self.nav_cursor {
            Some(0) | None => {
                self.nav_cursor = None;
                None
            }
            Some(i) => {
                self.nav_cursor = Some(i - 1);
                self.get(i - 1).map(|e| e.line.as_str())
            }
        }
    }

    /// Consume the navigation session (called on `AcceptLine`/`CancelLine`).
    pub fn nav_end(&mut self) {
        self.nav_cursor = None;
    }

    pub fn search_start(&mut self, pattern: &str) {
        self.search_pattern = Some(pattern.to_string());
        self.search = Some(SearchState { position: 0 });
    }

    fn matches(&self, entry: &HistoryEntry, pattern: &str) -> bool {
        if self.policy.case_sensitive {
            entry.line.contains(pattern)
        } else {
            entry.line.to_lowercase().contains(&pattern.to_lowercase())
        }
    }

    /// Advance to the next older entry matching the active search pattern.
    pub fn search_next(&mut self) -> Option<&HistoryEntry> {
        let pattern = self.search_pattern.clone()?;
        let mut state = self.search?;
        while state.position < self.count {
            if let Some(entry) = self.get(state.position) {
                if self.matches(entry, &pattern) {
                    let found_idx = state.position;
                    state.position += 1;
                    self.search = Some(state);
                    return self.get(found_idx);
                }
            }
            state.position += 1;
        }
        self.search = Some(state);
        None
    }

    /// Step back to the previous (newer) match, reversing `search_next`.
    pub fn search_prev(&mut self) -> Option<&HistoryEntry> {
        let pattern = self.search_pattern.clone()?;
        let mut state = self.search?;
        while state.position > 0 {
            state.position -= 1;
            if let Some(entry) = self.get(state.position) {
                if self.matches(entry, &pattern) {
                    self.search = Some(state);
                    return self.get(state.position);
                }
            }
        }
        self.search = Some(state);
        None
    }

    pub fn search_end(&mut self) {
        self.search_pattern = None;
        self.search = None;
    }

    /// Write entries oldest-first, one per line, truncating `path`.
    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        let mut file = fs::File::create(path).map_err(|_| HistoryError::FileOpen)?;
        for i in (0..self.count).rev() {
            if let Some(entry) = self.get(i) {
                writeln!(file, "{}", entry.line).map_err(|_| HistoryError::FileWrite)?;
            }
        }
        file.flush().map_err(|_| HistoryError::FileWrite)
    }

    /// Load entries from `path`, applying the same add-time policy. A
    /// missing file is treated as empty, not an error.
    pub fn load(&mut self, path: &Path) -> Result<(), HistoryError> {
        let file = match fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(_) => return Err(HistoryError::FileOpen),
        };
        let reader = io::BufReader::new(file);
        for line in reader.lines() {
            let line = line.map_err(|_| HistoryError::FileRead)?;
            let _ = self.add(&line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_empty_and_leading_space() {
        let mut h = History::new(4, HistoryPolicy::default()).unwrap();
        assert_eq!(h.add("").unwrap(), None);
        assert_eq!(h.add("   ").unwrap(), None);
        assert_eq!(h.add(" ls -la").unwrap(), None);
        assert_eq!(h.len(), 0);
    }

    #[test]
    fn add_dedups_consecutive_identical_lines() {
        let mut h = History::new(4, HistoryPolicy::default()).unwrap();
        h.add("ls").unwrap();
        assert_eq!(h.add("ls").unwrap(), None);
        assert_eq!(h.len(), 1);
        h.add("pwd").unwrap();
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn ring_evicts_oldest_at_capacity() {
        let mut h = History::new(2, HistoryPolicy::default()).unwrap();
        h.add("a").unwrap();
        h.add("b").unwrap();
        h.add("c").unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h.get(0).unwrap().line, "c");
        assert_eq!(h.get(1).unwrap().line, "b");
        assert!(h.get(2).is_none());
    }

    #[test]
    fn rejects_line_too_long() {
        let mut h = History::new(4, HistoryPolicy { max_line_bytes: 4, ..HistoryPolicy::default() }).unwrap();
        assert_eq!(h.add("this is way too long"), Err(HistoryError::LineTooLong));
    }

    #[test]
    fn nav_up_down_walks_and_resets() {
        let mut h = History::new(4, HistoryPolicy::default()).unwrap();
        h.add("one").unwrap();
        h.add("two").unwrap();
        h.add("three").unwrap();
        h.nav_start();
        assert_eq!(h.nav_up(), Some("three"));
        assert_eq!(h.nav_up(), Some("two"));
        assert_eq!(h.nav_up(), Some("one"));
        assert_eq!(h.nav_up(), None);
        assert_eq!(h.nav_down(), Some("two"));
        assert_eq!(h.nav_down(), Some("three"));
        assert_eq!(h.nav_down(), None);
    }

    #[test]
    fn search_next_and_prev() {
        let mut h = History::new(8, HistoryPolicy::default()).unwrap();
        h.add("git status").unwrap();
        h.add("ls -la").unwrap();
        h.add("git commit").unwrap();
        h.search_start("git");
        assert_eq!(h.search_next().unwrap().line, "git commit");
        assert_eq!(h.search_next().unwrap().line, "git status");
        assert_eq!(h.search_next(), None);
        assert_eq!(h.search_prev().unwrap().line, "git status");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let mut h = History::new(4, HistoryPolicy::default()).unwrap();
        h.add("one").unwrap();
        h.add("two").unwrap();
        h.save(&path).unwrap();

        let mut loaded = History::new(4, HistoryPolicy::default()).unwrap();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(0).unwrap().line, "two");
        assert_eq!(loaded.get(1).unwrap().line, "one");
    }

    #[test]
    fn load_missing_file_is_not_an_error() {
        let mut h = History::new(4, HistoryPolicy::default()).unwrap();
        assert!(h.load(Path::new("/nonexistent/edgeline-history-test-path")).is_ok());
        assert_eq!(h.len(), 0);
    }

    #[test]
    fn zero_capacity_is_invalid() {
        assert_eq!(History::new(0, HistoryPolicy::default()).unwrap_err(), HistoryError::InvalidSize);
    }
}
