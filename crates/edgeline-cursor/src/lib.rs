//! Pure cursor position math: mapping a byte offset inside a line buffer to
//! a row/column relative to the prompt, and back.
//!
//! Nothing here touches a terminal or mutates its inputs. `edgeline-display`
//! and `edgeline-core` call these functions to figure out where the cursor
//! belongs after every edit.

use edgeline_unicode as unicode;

/// Default tab stop width used when a caller doesn't have a `Config` handy.
pub const DEFAULT_TAB_WIDTH: u8 = 8;

/// Dimensions of the rendered prompt, supplied by the caller (the prompt
/// string is rendered by the embedder, not by this crate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptGeometry {
    /// Terminal width in columns.
    pub width: usize,
    /// Number of terminal rows the prompt occupies. Always `>= 1`.
    pub height: usize,
    /// Column at which the buffer's first codepoint starts, i.e. the
    /// display width of the prompt's last rendered line.
    pub last_line_width: usize,
}

impl PromptGeometry {
    /// A single-line prompt with no visible prompt text (cursor starts at
    /// column zero) in a terminal `width` columns wide.
    pub fn single_line(width: usize) -> Self {
        Self {
            width,
            height: 1,
            last_line_width: 0,
        }
    }
}

/// A cursor position relative to (and, once anchored, absolute within) the
/// prompt.
///
/// `rel_row`/`rel_col` are measured from the start of the prompt's last
/// line; this crate has no notion of where that line sits on the real
/// screen. `abs_row`/`abs_col` start out identical to `rel_row`/`rel_col`
/// and only gain meaning once a caller that *does* know the prompt's
/// on-screen anchor calls [`CursorPosition::anchored_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub abs_row: usize,
    pub abs_col: usize,
    pub rel_row: usize,
    pub rel_col: usize,
    pub at_wrap_boundary: bool,
    pub valid: bool,
}

impl CursorPosition {
    /// Fold in the absolute screen row the prompt's content area starts at,
    /// producing the real on-screen row/col. `content_row0` is the same
    /// value callers use to anchor their own redraws (prompt top + prompt
    /// height - 1, for a prompt that may span multiple rows).
    pub fn anchored_at(mut self, content_row0: usize) -> Self {
        self.abs_row = content_row0 + self.rel_row;
        self.abs_col = self.rel_col;
        self
    }
}

/// Walk the buffer's display columns from the start of the prompt's last
/// line up to (but not including) `upto`, returning the linear column total
/// after accounting for tab expansion and double-wide wrap pushes.
///
/// A double-wide codepoint that would straddle the terminal's right edge is
/// pushed entirely onto the next row; the skipped cell counts toward the
/// total so later arithmetic (`total / width`, `total % width`) lands on
/// the same row/col the terminal will actually display.
fn walk_columns(buffer: &[u8], term_width: usize, prompt_last_line_width: usize, tab_width: u8, upto: usize) -> usize {
    if term_width == 0 {
        return prompt_last_line_width;
    }
    let mut col = prompt_last_line_width % term_width;
    let mut rows = prompt_last_line_width / term_width;
    let mut pos = 0usize;
    let end = upto.min(buffer.len());
    while pos < end {
        let (cp, adv) = match unicode::decode_at(buffer, pos) {
            Ok(v) => v,
            Err(_) => break,
        };
        if cp == '\t' {
            let step = (tab_width as usize).min(term_width - col).max(1);
            col += step;
        } else {
            let w = unicode::display_width(cp) as usize;
            if w == 2 && col == term_width.saturating_sub(1) {
                rows += 1;
                col = 0;
            } else if col == term_width {
                rows += 1;
                col = 0;
            }
            col += w;
        }
        if col >= term_width {
            rows += col / term_width;
            col %= term_width;
        }
        pos += adv;
    }
    rows * term_width + col
}

/// Compute the on-screen position of byte offset `byte_offset` within
/// `buffer`, given the terminal/prompt geometry.
pub fn position_for_offset(buffer: &[u8], geometry: &PromptGeometry, tab_width: u8, byte_offset: usize) -> CursorPosition {
    if geometry.width == 0 {
        return CursorPosition {
            abs_row: 0,
            abs_col: 0,
            rel_row: 0,
            rel_col: 0,
            at_wrap_boundary: false,
            valid: false,
        };
    }
    let total = walk_columns(buffer, geometry.width, geometry.last_line_width, tab_width, byte_offset);
    let (rel_row, rel_col, at_wrap_boundary) = if total > 0 && total % geometry.width == 0 {
        (total / geometry.width, 0, true)
    } else {
        (total / geometry.width, total % geometry.width, false)
    };
    CursorPosition {
        abs_row: rel_row,
        abs_col: rel_col,
        rel_row,
        rel_col,
        at_wrap_boundary,
        valid: true,
    }
}

/// Inverse of [`position_for_offset`]: given a target row/col relative to
/// the prompt's last line, find the byte offset in `buffer` that lands
/// there. Returns `None` only when `geometry.width == 0`.
pub fn offset_for_position(
    buffer: &[u8],
    geometry: &PromptGeometry,
    tab_width: u8,
    pos: CursorPosition,
) -> Option<usize> {
    if geometry.width == 0 {
        return None;
    }
    let target = if pos.at_wrap_boundary && pos.rel_col == 0 {
        pos.rel_row * geometry.width
    } else {
        pos.rel_row * geometry.width + pos.rel_col
    };

    let mut col = geometry.last_line_width % geometry.width;
    let mut rows = geometry.last_line_width / geometry.width;
    let mut byte_pos = 0usize;
    while byte_pos < buffer.len() {
        if rows * geometry.width + col >= target {
            break;
        }
        let (cp, adv) = match unicode::decode_at(buffer, byte_pos) {
            Ok(v) => v,
            Err(_) => break,
        };
        if cp == '\t' {
            let step = (tab_width as usize).min(geometry.width - col).max(1);
            col += step;
        } else {
            let w = unicode::display_width(cp) as usize;
            if w == 2 && col == geometry.width.saturating_sub(1) {
                rows += 1;
                col = 0;
            } else if col == geometry.width {
                rows += 1;
                col = 0;
            }
            col += w;
        }
        if col >= geometry.width {
            rows += col / geometry.width;
            col %= geometry.width;
        }
        byte_pos += adv;
    }
    Some(byte_pos.min(buffer.len()))
}

/// Number of terminal rows `buffer`'s full contents occupy, given the
/// prompt's geometry. Always at least 1.
pub fn lines_occupied(buffer: &[u8], geometry: &PromptGeometry, tab_width: u8) -> usize {
    if geometry.width == 0 {
        return 1;
    }
    let total = walk_columns(buffer, geometry.width, geometry.last_line_width, tab_width, buffer.len());
    total.div_ceil(geometry.width).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_at_adds_content_row() {
        let geom = PromptGeometry { width: 80, height: 1, last_line_width: 4 };
        let pos = position_for_offset(b"abc", &geom, DEFAULT_TAB_WIDTH, 3).anchored_at(5);
        assert_eq!(pos.abs_row, 5);
        assert_eq!(pos.abs_col, pos.rel_col);
    }

    #[test]
    fn ascii_single_line_no_wrap() {
        let geom = PromptGeometry { width: 80, height: 1, last_line_width: 4 };
        let buf = b"abc";
        let pos = position_for_offset(buf, &geom, DEFAULT_TAB_WIDTH, 3);
        assert_eq!(pos.rel_row, 0);
        assert_eq!(pos.rel_col, 7);
        assert!(!pos.at_wrap_boundary);
    }

    #[test]
    fn wraps_at_exact_boundary() {
        let geom = PromptGeometry { width: 5, height: 1, last_line_width: 0 };
        let buf = b"abcde";
        let pos = position_for_offset(buf, &geom, DEFAULT_TAB_WIDTH, 5);
        assert_eq!(pos.rel_row, 1);
        assert_eq!(pos.rel_col, 0);
        assert!(pos.at_wrap_boundary);
    }

    #[test]
    fn double_wide_pushed_to_next_row() {
        let geom = PromptGeometry { width: 5, height: 1, last_line_width: 0 };
        // four narrow cols then a wide char that would straddle col 4/5.
        let buf = "abcd界".as_bytes();
        let total_byte_len = buf.len();
        let pos = position_for_offset(buf, &geom, DEFAULT_TAB_WIDTH, total_byte_len);
        // "abcd" fills cols 0..4, leaving 1 free cell; 界 (width 2) cannot fit
        // so it is pushed whole to row 1.
        assert_eq!(pos.rel_row, 1);
        assert_eq!(pos.rel_col, 2);
    }

    #[test]
    fn tab_expands_to_next_stop() {
        let geom = PromptGeometry { width: 20, height: 1, last_line_width: 0 };
        let buf = b"a\t";
        let pos = position_for_offset(buf, &geom, 8, 2);
        assert_eq!(pos.rel_col, 8);
    }

    #[test]
    fn offset_for_position_round_trips() {
        let geom = PromptGeometry { width: 6, height: 1, last_line_width: 2 };
        let buf = "hello world".as_bytes();
        for offset in [0, 1, 4, 6, 9, buf.len()] {
            let pos = position_for_offset(buf, &geom, DEFAULT_TAB_WIDTH, offset);
            let back = offset_for_position(buf, &geom, DEFAULT_TAB_WIDTH, pos).unwrap();
            assert_eq!(back, offset, "offset {offset} did not round-trip");
        }
    }

    #[test]
    fn lines_occupied_min_one() {
        let geom = PromptGeometry::single_line(10);
        assert_eq!(lines_occupied(b"", &geom, DEFAULT_TAB_WIDTH), 1);
        let geom2 = PromptGeometry { width: 5, height: 1, last_line_width: 0 };
        assert_eq!(lines_occupied(b"abcdefghij", &geom2, DEFAULT_TAB_WIDTH), 2);
    }
}
