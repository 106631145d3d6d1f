//! Reconciles a text buffer against the mirrored [`TerminalGrid`] and
//! produces the byte sequence that brings the real terminal in sync.
//!
//! `DisplaySync` never writes to a terminal itself — it returns a write
//! plan (plain bytes built from a fixed allow-list of ANSI escapes) that
//! the embedder sends down the wire, and applies that same plan to its own
//! grid mirror so the two stay consistent.

use edgeline_cursor::{position_for_offset, PromptGeometry};
use edgeline_grid::TerminalGrid;
use edgeline_unicode as unicode;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Default number of consecutive divergences tolerated before surfacing
/// [`DisplayError::Unrecoverable`].
pub const DEFAULT_DIVERGENCE_LIMIT: u32 = 5;

/// Hint describing what changed in the buffer, used to pick the cheapest
/// reconciliation strategy that is still guaranteed correct.
#[derive(Debug, Clone)]
pub enum Intent {
    /// Bytes were inserted at `pos`.
    InsertAt { pos: usize },
    /// `removed_len` bytes were deleted starting at `pos`.
    DeleteAt { pos: usize, removed_len: usize },
    /// The buffer content may have changed arbitrarily; redraw everything.
    ReplaceAll,
    /// Only the cursor moved; content is unchanged.
    CursorOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// The grid failed to match the desired state after
    /// [`DEFAULT_DIVERGENCE_LIMIT`] consecutive corrective redraws. The
    /// session must redraw the prompt itself, not just the content area.
    Unrecoverable,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("terminal display state could not be reconciled; redraw the prompt")
    }
}

impl std::error::Error for DisplayError {}

/// Where the prompt lives on screen, in absolute terminal rows/cols.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub prompt_top: usize,
    pub prompt_height: usize,
}

/// The reconciler. Owns no buffer state of its own beyond the divergence
/// counter; everything else is passed in per call.
pub struct DisplaySync {
    divergence_count: u32,
    divergence_limit: u32,
}

impl Default for DisplaySync {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySync {
    pub fn new() -> Self {
        Self {
            divergence_count: 0,
            divergence_limit: DEFAULT_DIVERGENCE_LIMIT,
        }
    }

    pub fn with_divergence_limit(limit: u32) -> Self {
        Self {
            divergence_count: 0,
            divergence_limit: limit,
        }
    }

    /// Reconcile `grid` so it reflects `buffer`/`cursor_byte`, returning the
    /// byte sequence that was (or should be) sent to the real terminal.
    pub fn reconcile(
        &mut self,
        buffer: &[u8],
        cursor_byte: usize,
        geometry: &PromptGeometry,
        tab_width: u8,
        anchor: Anchor,
        grid: &mut TerminalGrid,
        intent: Intent,
    ) -> Result<Vec<u8>, DisplayError> {
        let content_row0 = anchor.prompt_top + anchor.prompt_height.saturating_sub(1);
        let content_col0 = geometry.last_line_width;

        let cursor_target = self.target_cursor(buffer, cursor_byte, geometry, tab_width, content_row0);

        let mut plan = match &intent {
            Intent::CursorOnly => cup(cursor_target.0, cursor_target.1),
            Intent::InsertAt { pos } => self.targeted_or_full(
                buffer,
                geometry,
                tab_width,
                *pos,
                cursor_target,
                content_row0,
                content_col0,
            ),
            Intent::DeleteAt { pos, .. } => self.targeted_or_full(
                buffer,
                geometry,
                tab_width,
                *pos,
                cursor_target,
                content_row0,
                content_col0,
            ),
            Intent::ReplaceAll => full_redraw(buffer, content_row0, content_col0, cursor_target),
        };

        grid.write(&plan);

        let desired = desired_hash(buffer, geometry, tab_width, content_row0, content_col0, grid.width(), grid.height());
        let actual = actual_hash(grid, content_row0);

        if desired == actual {
            self.divergence_count = 0;
            tracing::trace!(target: "edgeline::display", intent = ?debug_label(&intent), "reconcile applied");
            return Ok(plan);
        }

        self.divergence_count += 1;
        tracing::warn!(
            target: "edgeline::display",
            divergence_count = self.divergence_count,
            "display grid diverged from desired state; escalating to full redraw"
        );
        if self.divergence_count >= self.divergence_limit {
            return Err(DisplayError::Unrecoverable);
        }

        let corrective = full_redraw(buffer, content_row0, content_col0, cursor_target);
        grid.write(&corrective);
        plan.extend_from_slice(&corrective);
        Ok(plan)
    }

    fn target_cursor(
        &self,
        buffer: &[u8],
        cursor_byte: usize,
        geometry: &PromptGeometry,
        tab_width: u8,
        content_row0: usize,
    ) -> (usize, usize) {
        let pos = position_for_offset(buffer, geometry, tab_width, cursor_byte).anchored_at(content_row0);
        (pos.abs_row, pos.abs_col)
    }

    #[allow(clippy::too_many_arguments)]
    fn targeted_or_full(
        &self,
        buffer: &[u8],
        geometry: &PromptGeometry,
        tab_width: u8,
        pos: usize,
        cursor_target: (usize, usize),
        content_row0: usize,
        content_col0: usize,
    ) -> Vec<u8> {
        let change_pos = position_for_offset(buffer, geometry, tab_width, pos);
        let end_pos = position_for_offset(buffer, geometry, tab_width, buffer.len());
        let stays_on_one_row = change_pos.rel_row == end_pos.rel_row && change_pos.rel_row == cursor_target.0 - content_row0;

        if !stays_on_one_row {
            return full_redraw(buffer, content_row0, content_col0, cursor_target);
        }

        let tail = &buffer[pos.min(buffer.len())..];
        let mut plan = cup(content_row0 + change_pos.rel_row, change_pos.rel_col);
        plan.extend_from_slice(tail);
        plan.extend_from_slice(EL_TO_EOL);
        plan.extend_from_slice(&cup(cursor_target.0, cursor_target.1));
        plan
    }
}

const EL_TO_EOL: &[u8] = b"\x1b[0K";
const ED_TO_EOS: &[u8] = b"\x1b[0J";

fn cup(row: usize, col: usize) -> Vec<u8> {
    format!("\x1b[{};{}H", row + 1, col + 1).into_bytes()
}

fn full_redraw(buffer: &[u8], content_row0: usize, content_col0: usize, cursor_target: (usize, usize)) -> Vec<u8> {
    let mut plan = cup(content_row0, content_col0);
    plan.extend_from_slice(ED_TO_EOS);
    plan.extend_from_slice(buffer);
    plan.extend_from_slice(&cup(cursor_target.0, cursor_target.1));
    plan
}

#[allow(clippy::too_many_arguments)]
fn desired_hash(
    buffer: &[u8],
    geometry: &PromptGeometry,
    tab_width: u8,
    content_row0: usize,
    content_col0: usize,
    term_width: usize,
    term_height: usize,
) -> u64 {
    let mut hasher = DefaultHasher::new();
    let mut row = content_row0;
    let mut col = content_col0;
    let mut pos = 0usize;
    while pos < buffer.len() {
        let (cp, adv) = match unicode::decode_at(buffer, pos) {
            Ok(v) => v,
            Err(_) => break,
        };
        if cp == '\t' {
            let step = (tab_width as usize).min(geometry.width.saturating_sub(col)).max(1);
            col += step;
        } else {
            let w = unicode::display_width(cp) as usize;
            if w == 2 && col + 1 >= geometry.width {
                row += 1;
                col = 0;
            }
            if row < term_height && col < term_width {
                (row, col, Some(cp)).hash(&mut hasher);
            }
            col += w;
        }
        if col >= geometry.width {
            row += col / geometry.width.max(1);
            col %= geometry.width.max(1);
        }
        pos += adv;
    }
    hasher.finish()
}

fn actual_hash(grid: &TerminalGrid, content_row0: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    for row in content_row0..grid.height() {
        for col in 0..grid.width() {
            if let Some(cell) = grid.cell_at(row, col) {
                if cell.ch.is_some() {
                    (row, col, cell.ch).hash(&mut hasher);
                }
            }
        }
    }
    hasher.finish()
}

fn debug_label(intent: &Intent) -> &'static str {
    match intent {
        Intent::InsertAt { .. } => "insert_at",
        Intent::DeleteAt { .. } => "delete_at",
        Intent::ReplaceAll => "replace_all",
        Intent::CursorOnly => "cursor_only",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeline_text::TextBuffer;

    fn geom(width: usize) -> PromptGeometry {
        PromptGeometry { width, height: 1, last_line_width: 2 }
    }

    #[test]
    fn cursor_only_moves_without_touching_content() {
        let mut grid = TerminalGrid::new(20, 5);
        let mut sync = DisplaySync::new();
        let buf = TextBuffer::from_str("hello");
        let anchor = Anchor { prompt_top: 0, prompt_height: 1 };
        sync.reconcile(buf.as_str().as_bytes(), 0, &geom(20), 8, anchor, &mut grid, Intent::ReplaceAll)
            .unwrap();
        sync.reconcile(buf.as_str().as_bytes(), 3, &geom(20), 8, anchor, &mut grid, Intent::CursorOnly)
            .unwrap();
        assert_eq!(grid.cursor(), (0, 2 + 3));
        assert_eq!(grid.cell_at(0, 2).unwrap().ch, Some('h'));
    }

    #[test]
    fn replace_all_draws_full_content() {
        let mut grid = TerminalGrid::new(20, 5);
        let mut sync = DisplaySync::new();
        let buf = TextBuffer::from_str("abc");
        let anchor = Anchor { prompt_top: 1, prompt_height: 1 };
        sync.reconcile(buf.as_str().as_bytes(), 3, &geom(20), 8, anchor, &mut grid, Intent::ReplaceAll)
            .unwrap();
        assert_eq!(grid.cell_at(1, 2).unwrap().ch, Some('a'));
        assert_eq!(grid.cell_at(1, 4).unwrap().ch, Some('c'));
        assert_eq!(grid.cursor(), (1, 5));
    }

    #[test]
    fn multi_row_prompt_places_cursor_below_prompt() {
        let mut grid = TerminalGrid::new(20, 5);
        let mut sync = DisplaySync::new();
        let buf = TextBuffer::from_str("hi");
        // A 2-row prompt anchored at row 1: content starts at row 1+2-1=2.
        let anchor = Anchor { prompt_top: 1, prompt_height: 2 };
        sync.reconcile(buf.as_str().as_bytes(), 2, &geom(20), 8, anchor, &mut grid, Intent::ReplaceAll)
            .unwrap();
        assert_eq!(grid.cell_at(2, 2).unwrap().ch, Some('h'));
        assert_eq!(grid.cell_at(2, 3).unwrap().ch, Some('i'));
        assert_eq!(grid.cursor(), (2, 4));
    }

    #[test]
    fn insert_at_targets_single_row() {
        let mut grid = TerminalGrid::new(40, 5);
        let mut sync = DisplaySync::new();
        let anchor = Anchor { prompt_top: 0, prompt_height: 1 };
        let mut buf = TextBuffer::from_str("ac");
        sync.reconcile(buf.as_str().as_bytes(), 2, &geom(40), 8, anchor, &mut grid, Intent::ReplaceAll)
            .unwrap();
        buf.set_cursor_byte(1).unwrap();
        buf.insert_codepoint('b').unwrap();
        sync.reconcile(buf.as_str().as_bytes(), buf.cursor_byte(), &geom(40), 8, anchor, &mut grid, Intent::InsertAt { pos: 1 })
            .unwrap();
        assert_eq!(grid.cell_at(0, 2).unwrap().ch, Some('a'));
        assert_eq!(grid.cell_at(0, 3).unwrap().ch, Some('b'));
        assert_eq!(grid.cell_at(0, 4).unwrap().ch, Some('c'));
    }
}
