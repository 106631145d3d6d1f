//! A UTF-8 aware, single-line text buffer with a byte-offset cursor.
//!
//! `TextBuffer` owns the raw bytes being edited at a shell prompt. It never
//! stores invalid UTF-8 and never lets the cursor land off a codepoint
//! boundary; every mutating method either succeeds or returns a [`TextError`]
//! without leaving the buffer in a half-mutated state.

use edgeline_unicode as unicode;
use std::fmt;

/// Hard cap on buffer size, in bytes. Chosen generously above any realistic
/// shell command while still bounding pathological paste-driven growth.
pub const CAPACITY_HARD_CAP: usize = 100 * 1024;

const INITIAL_CAPACITY: usize = 64;

/// Reject any decoded codepoint that is a control character other than tab
/// (e.g. ESC, which would otherwise let raw ANSI sequences slip into the
/// buffer as ordinary content).
fn reject_control_bytes(bytes: &[u8]) -> Result<(), TextError> {
    let mut pos = 0;
    while pos < bytes.len() {
        let (cp, adv) = unicode::decode_at(bytes, pos).map_err(|_| TextError::InvalidUtf8)?;
        if cp.is_control() && cp != '\t' {
            return Err(TextError::ControlByte);
        }
        pos += adv;
    }
    Ok(())
}

/// Errors returned by [`TextBuffer`] mutators. No method panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextError {
    /// A byte offset fell outside `[0, len]`.
    OutOfBounds,
    /// A byte offset did not land on a UTF-8 codepoint boundary.
    NonBoundary,
    /// The hard capacity cap ([`CAPACITY_HARD_CAP`]) would be exceeded.
    CapacityExceeded,
    /// Input bytes were not well-formed UTF-8.
    InvalidUtf8,
    /// Input decoded to a control codepoint other than tab.
    ControlByte,
}

impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TextError::OutOfBounds => "byte offset out of bounds",
            TextError::NonBoundary => "byte offset is not on a codepoint boundary",
            TextError::CapacityExceeded => "buffer capacity hard cap exceeded",
            TextError::InvalidUtf8 => "input bytes are not valid UTF-8",
            TextError::ControlByte => "input contains a control byte other than tab",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for TextError {}

/// Outcome of a mutator that may have nothing to do (e.g. backspace at
/// column zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The buffer changed.
    Mutated,
    /// Legal call, but there was nothing to do.
    NoOp,
}

/// A single-line, UTF-8 aware, growable text buffer with a byte-offset
/// cursor that is always on a codepoint boundary.
#[derive(Clone)]
pub struct TextBuffer {
    bytes: Vec<u8>,
    len: usize,
    cursor_byte: usize,
    char_count: usize,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    /// Construct an empty buffer with at least [`INITIAL_CAPACITY`] bytes of
    /// backing storage reserved.
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(INITIAL_CAPACITY),
            len: 0,
            cursor_byte: 0,
            char_count: 0,
        }
    }

    /// Construct a buffer pre-populated with `text`, cursor at the end.
    pub fn from_str(text: &str) -> Self {
        let mut buf = Self::new();
        // `insert_slice` cannot fail on already-validated UTF-8 within the
        // hard cap; shell lines never approach 100 KiB in practice.
        let _ = buf.insert_slice(text.as_bytes());
        buf
    }

    /// Number of valid bytes currently stored (excludes any sentinel).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of codepoints currently stored.
    pub fn char_count(&self) -> usize {
        self.char_count
    }

    /// Current cursor byte offset, always `<= len()` and on a boundary.
    pub fn cursor_byte(&self) -> usize {
        self.cursor_byte
    }

    /// The valid UTF-8 content as a `&str`.
    pub fn as_str(&self) -> &str {
        // Safety invariant: `bytes[0..len]` is always well-formed UTF-8.
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or("")
    }

    fn check_boundary(&self, pos: usize) -> Result<(), TextError> {
        if pos > self.len {
            return Err(TextError::OutOfBounds);
        }
        if pos == self.len || pos == 0 {
            return Ok(());
        }
        if unicode::next_boundary(&self.bytes[..self.len], unicode::prev_boundary(&self.bytes[..self.len], pos)) != pos {
            return Err(TextError::NonBoundary);
        }
        Ok(())
    }

    /// Set the cursor to an absolute byte offset.
    ///
    /// Fails if `pos` is out of bounds or not on a codepoint boundary.
    pub fn set_cursor_byte(&mut self, pos: usize) -> Result<(), TextError> {
        self.check_boundary(pos)?;
        self.cursor_byte = pos;
        Ok(())
    }

    fn reserve_for(&mut self, additional: usize) -> Result<(), TextError> {
        if self.len + additional > CAPACITY_HARD_CAP {
            return Err(TextError::CapacityExceeded);
        }
        if self.bytes.capacity() < self.len + additional {
            let mut target = self.bytes.capacity().max(INITIAL_CAPACITY);
            while target < self.len + additional {
                target *= 2;
            }
            self.bytes.reserve(target - self.bytes.capacity());
        }
        Ok(())
    }

    /// Insert a single codepoint at the cursor, advancing the cursor past it.
    pub fn insert_codepoint(&mut self, cp: char) -> Result<(), TextError> {
        let mut buf = [0u8; 4];
        let encoded = cp.encode_utf8(&mut buf);
        self.insert_slice(encoded.as_bytes())
    }

    /// Insert raw UTF-8 bytes at the cursor, advancing the cursor past them.
    ///
    /// Fails if `bytes` is not valid UTF-8, contains a control codepoint
    /// other than tab, or the hard cap would be exceeded.
    pub fn insert_slice(&mut self, bytes: &[u8]) -> Result<(), TextError> {
        unicode::validate(bytes).map_err(|_| TextError::InvalidUtf8)?;
        reject_control_bytes(bytes)?;
        if bytes.is_empty() {
            return Ok(());
        }
        self.reserve_for(bytes.len())?;
        let at = self.cursor_byte;
        self.bytes.splice(at..at, bytes.iter().copied());
        self.len += bytes.len();
        self.cursor_byte += bytes.len();
        self.char_count += unicode::count_codepoints(bytes);
        tracing::trace!(target: "edgeline::text", at, inserted = bytes.len(), "insert_slice");
        Ok(())
    }

    /// Delete the codepoint immediately at the cursor (Delete key).
    pub fn delete_forward(&mut self) -> EditOutcome {
        if self.cursor_byte >= self.len {
            return EditOutcome::NoOp;
        }
        let end = unicode::next_boundary(&self.bytes[..self.len], self.cursor_byte);
        self.remove_range(self.cursor_byte, end);
        EditOutcome::Mutated
    }

    /// Delete the codepoint immediately before the cursor (Backspace key).
    pub fn backspace(&mut self) -> EditOutcome {
        if self.cursor_byte == 0 {
            return EditOutcome::NoOp;
        }
        let start = unicode::prev_boundary(&self.bytes[..self.len], self.cursor_byte);
        let end = self.cursor_byte;
        self.remove_range(start, end);
        self.cursor_byte = start;
        EditOutcome::Mutated
    }

    /// Delete the half-open byte range `[start, end)`.
    ///
    /// Both offsets must land on codepoint boundaries and satisfy `start <=
    /// end <= len()`. Cursor policy: if the cursor was at or past `end` it
    /// shifts left by the removed length; if it was strictly inside the
    /// range it snaps to `start`; otherwise it is unaffected.
    pub fn delete_range(&mut self, start: usize, end: usize) -> Result<(), TextError> {
        if start > end || end > self.len {
            return Err(TextError::OutOfBounds);
        }
        self.check_boundary(start)?;
        self.check_boundary(end)?;
        if start == end {
            return Ok(());
        }
        let removed = end - start;
        self.remove_range(start, end);
        if self.cursor_byte >= end {
            self.cursor_byte -= removed;
        } else if self.cursor_byte > start {
            self.cursor_byte = start;
        }
        Ok(())
    }

    fn remove_range(&mut self, start: usize, end: usize) {
        let removed_chars = unicode::count_codepoints(&self.bytes[start..end]);
        self.bytes.splice(start..end, std::iter::empty());
        self.len -= end - start;
        self.char_count -= removed_chars;
        tracing::trace!(target: "edgeline::text", start, end, "remove_range");
    }

    /// Move the cursor one codepoint to the left. `NoOp` at column zero.
    pub fn move_left(&mut self) -> EditOutcome {
        if self.cursor_byte == 0 {
            return EditOutcome::NoOp;
        }
        self.cursor_byte = unicode::prev_boundary(&self.bytes[..self.len], self.cursor_byte);
        EditOutcome::Mutated
    }

    /// Move the cursor one codepoint to the right. `NoOp` at end of line.
    pub fn move_right(&mut self) -> EditOutcome {
        if self.cursor_byte >= self.len {
            return EditOutcome::NoOp;
        }
        self.cursor_byte = unicode::next_boundary(&self.bytes[..self.len], self.cursor_byte);
        EditOutcome::Mutated
    }

    pub fn move_home(&mut self) -> EditOutcome {
        if self.cursor_byte == 0 {
            return EditOutcome::NoOp;
        }
        self.cursor_byte = 0;
        EditOutcome::Mutated
    }

    pub fn move_end(&mut self) -> EditOutcome {
        if self.cursor_byte == self.len {
            return EditOutcome::NoOp;
        }
        self.cursor_byte = self.len;
        EditOutcome::Mutated
    }

    fn codepoint_at(&self, byte_pos: usize) -> Option<char> {
        if byte_pos >= self.len {
            return None;
        }
        unicode::decode_at(&self.bytes[..self.len], byte_pos)
            .ok()
            .map(|(cp, _)| cp)
    }

    /// Move left past any boundary whitespace/punctuation, then past the
    /// word itself, landing on the word's first codepoint.
    pub fn move_word_left(&mut self) -> EditOutcome {
        if self.cursor_byte == 0 {
            return EditOutcome::NoOp;
        }
        let start = self.cursor_byte;
        let mut pos = unicode::prev_boundary(&self.bytes[..self.len], self.cursor_byte);
        while pos > 0 {
            let cp = self.codepoint_at(pos).unwrap_or(' ');
            if unicode::is_word_char(cp) {
                break;
            }
            pos = unicode::prev_boundary(&self.bytes[..self.len], pos);
        }
        while pos > 0 {
            let prev = unicode::prev_boundary(&self.bytes[..self.len], pos);
            let cp = self.codepoint_at(prev).unwrap_or(' ');
            if !unicode::is_word_char(cp) {
                break;
            }
            pos = prev;
        }
        self.cursor_byte = pos;
        if pos == start {
            EditOutcome::NoOp
        } else {
            EditOutcome::Mutated
        }
    }

    /// Skip the current word, then any boundary whitespace/punctuation,
    /// landing on the next word's first codepoint (or end of buffer).
    pub fn move_word_right(&mut self) -> EditOutcome {
        if self.cursor_byte >= self.len {
            return EditOutcome::NoOp;
        }
        let start = self.cursor_byte;
        let mut pos = self.cursor_byte;
        while pos < self.len {
            let cp = self.codepoint_at(pos).unwrap_or(' ');
            if !unicode::is_word_char(cp) {
                break;
            }
            pos = unicode::next_boundary(&self.bytes[..self.len], pos);
        }
        while pos < self.len {
            let cp = self.codepoint_at(pos).unwrap_or(' ');
            if unicode::is_word_char(cp) {
                break;
            }
            pos = unicode::next_boundary(&self.bytes[..self.len], pos);
        }
        self.cursor_byte = pos;
        if pos == start {
            EditOutcome::NoOp
        } else {
            EditOutcome::Mutated
        }
    }

    /// Clear the buffer entirely; cursor resets to zero.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.len = 0;
        self.cursor_byte = 0;
        self.char_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_backspace_ascii() {
        let mut b = TextBuffer::new();
        for c in "abcdefgh".chars() {
            b.insert_codepoint(c).unwrap();
        }
        assert_eq!(b.as_str(), "abcdefgh");
        assert_eq!(b.cursor_byte(), 8);
        assert_eq!(b.backspace(), EditOutcome::Mutated);
        assert_eq!(b.as_str(), "abcdefg");
        assert_eq!(b.cursor_byte(), 7);
    }

    #[test]
    fn insert_and_backspace_wide_cjk() {
        let mut b = TextBuffer::new();
        for c in "世界!".chars() {
            b.insert_codepoint(c).unwrap();
        }
        assert_eq!(b.char_count(), 3);
        assert_eq!(b.backspace(), EditOutcome::Mutated); // removes '!'
        assert_eq!(b.as_str(), "世界");
        assert_eq!(b.backspace(), EditOutcome::Mutated); // removes '界' (3 bytes)
        assert_eq!(b.as_str(), "世");
        assert_eq!(b.cursor_byte(), "世".len());
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut b = TextBuffer::new();
        assert_eq!(b.backspace(), EditOutcome::NoOp);
    }

    #[test]
    fn delete_forward_at_end_is_noop() {
        let mut b = TextBuffer::from_str("hi");
        b.set_cursor_byte(2).unwrap();
        assert_eq!(b.delete_forward(), EditOutcome::NoOp);
    }

    #[test]
    fn delete_range_cursor_policy() {
        let mut b = TextBuffer::from_str("abcdef");
        b.set_cursor_byte(6).unwrap();
        b.delete_range(2, 4).unwrap(); // cursor >= end -> shifts left
        assert_eq!(b.as_str(), "abef");
        assert_eq!(b.cursor_byte(), 4);

        let mut b2 = TextBuffer::from_str("abcdef");
        b2.set_cursor_byte(3).unwrap();
        b2.delete_range(1, 5).unwrap(); // cursor inside range -> snaps to start
        assert_eq!(b2.as_str(), "af");
        assert_eq!(b2.cursor_byte(), 1);
    }

    #[test]
    fn set_cursor_rejects_non_boundary() {
        let mut b = TextBuffer::from_str("世");
        assert_eq!(b.set_cursor_byte(1), Err(TextError::NonBoundary));
        assert_eq!(b.set_cursor_byte(5), Err(TextError::OutOfBounds));
        assert!(b.set_cursor_byte(0).is_ok());
        assert!(b.set_cursor_byte(3).is_ok());
    }

    #[test]
    fn word_motion_basic() {
        let mut b = TextBuffer::from_str("foo bar  baz");
        b.set_cursor_byte(b.len()).unwrap();
        b.move_word_left();
        assert_eq!(b.cursor_byte(), "foo bar  ".len());
        b.move_word_left();
        assert_eq!(b.cursor_byte(), "foo ".len());
        b.move_word_left();
        assert_eq!(b.cursor_byte(), 0);
        assert_eq!(b.move_word_left(), EditOutcome::NoOp);

        b.move_word_right();
        assert_eq!(b.cursor_byte(), "foo".len());
        b.move_word_right();
        assert_eq!(b.cursor_byte(), "foo bar".len());
        b.move_word_right();
        assert_eq!(b.cursor_byte(), b.len());
        assert_eq!(b.move_word_right(), EditOutcome::NoOp);
    }

    #[test]
    fn clear_resets_everything() {
        let mut b = TextBuffer::from_str("hello");
        b.clear();
        assert_eq!(b.len(), 0);
        assert_eq!(b.cursor_byte(), 0);
        assert_eq!(b.char_count(), 0);
        assert!(b.is_empty());
    }

    #[test]
    fn insert_slice_rejects_invalid_utf8() {
        let mut b = TextBuffer::new();
        let bad = [0x61, 0xff];
        assert_eq!(b.insert_slice(&bad), Err(TextError::InvalidUtf8));
    }

    #[test]
    fn insert_slice_rejects_control_bytes() {
        let mut b = TextBuffer::new();
        assert_eq!(b.insert_slice(b"a\x1b[31mb"), Err(TextError::ControlByte));
        assert!(b.is_empty());
    }

    #[test]
    fn insert_slice_allows_tab() {
        let mut b = TextBuffer::new();
        b.insert_slice(b"a\tb").unwrap();
        assert_eq!(b.as_str(), "a\tb");
    }

    #[test]
    fn capacity_hard_cap_enforced() {
        let mut b = TextBuffer::new();
        let chunk = vec![b'a'; CAPACITY_HARD_CAP];
        assert_eq!(b.insert_slice(&chunk), Err(TextError::CapacityExceeded));
    }
}
