//! UTF-8 decoding, codepoint display width, and boundary navigation.
//!
//! This crate is the single source of truth for "how wide is this character
//! on screen" and "where does the codepoint before/after this byte start".
//! Every other crate in the workspace routes width and boundary decisions
//! through here instead of calling `unicode_width` directly.

use std::fmt;

/// Error returned by [`decode_at`] when the bytes at the given offset are not
/// a valid UTF-8 sequence. Callers never store invalid UTF-8; on this error
/// they treat the offending byte as a single-byte codepoint of width 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub at: usize,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid UTF-8 sequence at byte offset {}", self.at)
    }
}

impl std::error::Error for DecodeError {}

/// Decode a single UTF-8 codepoint starting at byte offset `i`.
///
/// Returns the decoded `char` and the number of bytes it occupied. `i` must
/// be within `bytes.len()`; the caller guarantees `bytes[0..]` up to the
/// buffer's logical length is well-formed UTF-8 except for the byte under
/// inspection, which this function is allowed to reject.
pub fn decode_at(bytes: &[u8], i: usize) -> Result<(char, usize), DecodeError> {
    if i >= bytes.len() {
        return Err(DecodeError { at: i });
    }
    let rest = std::str::from_utf8(&bytes[i..]).map_err(|e| {
        // A valid prefix before the error still lets us recover the first char.
        if e.valid_up_to() > 0 {
            e.valid_up_to()
        } else {
            0
        }
    });
    match rest {
        Ok(s) => {
            let ch = s.chars().next().ok_or(DecodeError { at: i })?;
            Ok((ch, ch.len_utf8()))
        }
        Err(valid_up_to) if valid_up_to > 0 => {
            let s = std::str::from_utf8(&bytes[i..i + valid_up_to]).map_err(|_| DecodeError { at: i })?;
            let ch = s.chars().next().ok_or(DecodeError { at: i })?;
            Ok((ch, ch.len_utf8()))
        }
        Err(_) => Err(DecodeError { at: i }),
    }
}

/// Return the start of the codepoint immediately preceding byte `i`.
///
/// `i == 0` returns `0`. Continuation bytes (`0b10xxxxxx`) are walked
/// backwards until a lead byte or the start of the slice is found.
pub fn prev_boundary(bytes: &[u8], i: usize) -> usize {
    if i == 0 {
        return 0;
    }
    let mut j = i.min(bytes.len()) - 1;
    while j > 0 && is_continuation(bytes[j]) {
        j -= 1;
    }
    j
}

/// Return the start of the codepoint immediately following byte `i`.
///
/// Returns `bytes.len()` if `i` is already at or past the last codepoint.
pub fn next_boundary(bytes: &[u8], i: usize) -> usize {
    if i >= bytes.len() {
        return bytes.len();
    }
    let mut j = i + 1;
    while j < bytes.len() && is_continuation(bytes[j]) {
        j += 1;
    }
    j
}

#[inline]
fn is_continuation(b: u8) -> bool {
    b & 0b1100_0000 == 0b1000_0000
}

/// Count codepoints in a well-formed UTF-8 slice.
pub fn count_codepoints(bytes: &[u8]) -> usize {
    std::str::from_utf8(bytes)
        .map(|s| s.chars().count())
        .unwrap_or_else(|_| bytes.iter().filter(|b| !is_continuation(**b)).count())
}

/// Validate that `bytes` is well-formed UTF-8.
pub fn validate(bytes: &[u8]) -> Result<(), DecodeError> {
    std::str::from_utf8(bytes)
        .map(|_| ())
        .map_err(|e| DecodeError { at: e.valid_up_to() })
}

// Named Unicode ranges backing `display_width`. Kept small and explicit
// rather than pulling in a full East-Asian-width property table; the ranges
// below cover the codepoints a shell line editor actually encounters.
const HANGUL_SYLLABLES: std::ops::RangeInclusive<u32> = 0xAC00..=0xD7A3;
const CJK_UNIFIED: std::ops::RangeInclusive<u32> = 0x4E00..=0x9FFF;
const CJK_COMPAT: std::ops::RangeInclusive<u32> = 0xF900..=0xFAFF;
const CJK_EXT_A: std::ops::RangeInclusive<u32> = 0x3400..=0x4DBF;
const FULLWIDTH_FORMS: std::ops::RangeInclusive<u32> = 0xFF00..=0xFFEF;
const HIRAGANA_KATAKANA: std::ops::RangeInclusive<u32> = 0x3040..=0x30FF;
const WIDE_EMOJI: std::ops::RangeInclusive<u32> = 0x1F300..=0x1FAFF;
const MISC_PICTOGRAPHIC: std::ops::RangeInclusive<u32> = 0x2600..=0x27BF;

const COMBINING_MARKS: std::ops::RangeInclusive<u32> = 0x0300..=0x036F;
const COMBINING_MARKS_EXT: std::ops::RangeInclusive<u32> = 0x1AB0..=0x1AFF;
const COMBINING_HALF_MARKS: std::ops::RangeInclusive<u32> = 0xFE20..=0xFE2F;
const VARIATION_SELECTORS: std::ops::RangeInclusive<u32> = 0xFE00..=0xFE0F;
const ZERO_WIDTH_JOINER: u32 = 0x200D;

/// Display width, in terminal columns, of a single codepoint: 0, 1, or 2.
///
/// Tab is not expanded here — callers that need tab expansion consult the
/// terminal width and current column (see `edgeline-cursor`); a bare tab
/// reported by this function has width 0 since it occupies no fixed cell
/// count on its own.
pub fn display_width(cp: char) -> u8 {
    let c = cp as u32;

    if cp == '\t' {
        return 0;
    }
    if cp.is_control() {
        return 0;
    }
    if c == ZERO_WIDTH_JOINER
        || COMBINING_MARKS.contains(&c)
        || COMBINING_MARKS_EXT.contains(&c)
        || COMBINING_HALF_MARKS.contains(&c)
        || VARIATION_SELECTORS.contains(&c)
    {
        return 0;
    }

    if HANGUL_SYLLABLES.contains(&c)
        || CJK_UNIFIED.contains(&c)
        || CJK_COMPAT.contains(&c)
        || CJK_EXT_A.contains(&c)
        || FULLWIDTH_FORMS.contains(&c)
        || HIRAGANA_KATAKANA.contains(&c)
        || WIDE_EMOJI.contains(&c)
        || MISC_PICTOGRAPHIC.contains(&c)
    {
        return 2;
    }

    match unicode_width::UnicodeWidthChar::width(cp) {
        Some(0) => 0,
        Some(2) => 2,
        _ => 1,
    }
}

/// Sum of [`display_width`] over every codepoint in `bytes`, treating ANSI
/// CSI sequences (`ESC [ ... final-byte`) as width 0 so prompt strings
/// carrying color codes measure correctly.
pub fn display_width_of_slice(bytes: &[u8]) -> usize {
    let s = match std::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(_) => return bytes.len(),
    };
    let mut total = 0usize;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                chars.next();
                for next in chars.by_ref() {
                    if ('@'..='~').contains(&next) {
                        break;
                    }
                }
            }
            continue;
        }
        total += display_width(c) as usize;
    }
    total
}

/// Classify a codepoint for word-motion purposes: `true` means it is part of
/// a "word" (the complement of ASCII punctuation and Unicode whitespace).
pub fn is_word_char(cp: char) -> bool {
    if cp.is_whitespace() {
        return false;
    }
    if cp.is_ascii_punctuation() {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_decode() {
        let b = b"abc";
        assert_eq!(decode_at(b, 0).unwrap(), ('a', 1));
        assert_eq!(next_boundary(b, 0), 1);
        assert_eq!(prev_boundary(b, 1), 0);
    }

    #[test]
    fn multibyte_boundaries() {
        let s = "a界b"; // 界 is 3 bytes
        let b = s.as_bytes();
        let after_a = next_boundary(b, 0);
        assert_eq!(after_a, 1);
        let after_cjk = next_boundary(b, after_a);
        assert_eq!(after_cjk, 4);
        assert_eq!(prev_boundary(b, after_cjk), after_a);
        assert_eq!(prev_boundary(b, after_a), 0);
    }

    #[test]
    fn widths() {
        assert_eq!(display_width('a'), 1);
        assert_eq!(display_width('界'), 2);
        assert_eq!(display_width('\u{0301}'), 0); // combining acute
        assert_eq!(display_width('한'), 2); // Hangul syllable
        assert_eq!(display_width('😀'), 2);
    }

    #[test]
    fn display_width_of_slice_ignores_csi() {
        let s = "\x1b[31mhi\x1b[0m";
        assert_eq!(display_width_of_slice(s.as_bytes()), 2);
    }

    #[test]
    fn count_codepoints_matches_chars() {
        let s = "a界😀";
        assert_eq!(count_codepoints(s.as_bytes()), s.chars().count());
    }

    #[test]
    fn validate_rejects_bad_utf8() {
        let bad = [0x61, 0xff, 0x62];
        assert!(validate(&bad).is_err());
        assert!(validate(b"ok").is_ok());
    }

    #[test]
    fn word_char_classification() {
        assert!(is_word_char('a'));
        assert!(!is_word_char(' '));
        assert!(!is_word_char('.'));
        // Underscore is not a word char here; word boundaries follow
        // alphanumeric runs only.
        assert!(!is_word_char('_'));
    }
}
