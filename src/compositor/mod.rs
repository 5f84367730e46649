//! Fixed-size character-grid compositor.
//!
//! The compositor turns an ordered stream of drawing instructions into a
//! renderable frame. State is fragment-based rather than cell-based: every
//! `write_str` call appends styled runs of text to the rows it touches, and
//! overlap between runs is resolved at flush time — first by start column,
//! then by a monotonically increasing write priority, so the most recent
//! write at a given column wins.
//!
//! Out-of-bounds policy: fragments are stored unclipped and clipped only
//! when a frame is composed; columns past the right edge are dropped
//! silently, and writes addressed to a line below the bottom row are
//! discarded with a warning. The engine is trusted to stay in bounds, so
//! neither case is an error.

mod frame;

pub use frame::{Caret, Cell, Frame};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::Color;

/// One contiguous run of styled text produced by a single write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    pub start_column: usize,
    pub priority: u64,
    pub foreground: Color,
    pub background: Color,
    pub text: String,
}

impl TextFragment {
    /// First column past the fragment, in characters.
    pub fn end_column(&self) -> usize {
        self.start_column + self.text.chars().count()
    }
}

/// The fragments accumulated on one grid row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ConsoleLine {
    fragments: Vec<TextFragment>,
}

/// Serializable deep copy of the full compositor state.
///
/// Stored inside the saved-session blob and compared against the state a
/// replay rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositorSnapshot {
    columns: usize,
    rows: usize,
    lines: Vec<ConsoleLine>,
    cursor_line: usize,
    cursor_column: usize,
    next_priority: u64,
    foreground: Color,
    background: Color,
}

impl CompositorSnapshot {
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Structural sanity check for snapshots decoded from untrusted blobs.
    pub fn is_well_formed(&self) -> bool {
        self.columns > 0
            && self.rows > 0
            && self.lines.len() == self.rows
            && self.cursor_line < self.rows
            && self
                .lines
                .iter()
                .all(|line| line.fragments.iter().all(|f| f.priority < self.next_priority))
    }
}

/// Fixed `columns x rows` grid compositor. Never resizes.
#[derive(Debug, Clone)]
pub struct Compositor {
    columns: usize,
    rows: usize,
    lines: Vec<ConsoleLine>,
    cursor_line: usize,
    cursor_column: usize,
    next_priority: u64,
    foreground: Color,
    background: Color,
}

impl Compositor {
    /// Conventional terminal geometry, shared with the scripted engine.
    pub const DEFAULT_COLUMNS: usize = 80;
    /// See [`DEFAULT_COLUMNS`](Self::DEFAULT_COLUMNS).
    pub const DEFAULT_ROWS: usize = 24;

    pub fn new(columns: usize, rows: usize) -> Self {
        assert!(columns > 0 && rows > 0, "grid must have a positive size");
        Compositor {
            columns,
            rows,
            lines: vec![ConsoleLine::default(); rows],
            cursor_line: 0,
            cursor_column: 0,
            next_priority: 0,
            foreground: Color::DEFAULT_FOREGROUND,
            background: Color::DEFAULT_BACKGROUND,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Current cursor position.
    pub fn cursor(&self) -> Caret {
        Caret {
            line: self.cursor_line,
            column: self.cursor_column,
        }
    }

    /// Drop every fragment, home the cursor and restart the priority
    /// counter. The current colors are deliberately left as they are.
    pub fn clear_screen(&mut self) {
        for line in &mut self.lines {
            line.fragments.clear();
        }
        self.cursor_line = 0;
        self.cursor_column = 0;
        self.next_priority = 0;
    }

    /// Write text at the cursor with the current colors.
    ///
    /// The string is split on newlines; each non-empty segment becomes one
    /// fragment and advances the cursor column, each newline moves the
    /// cursor to the start of the next line. The whole call counts as a
    /// single priority step, even for an empty string.
    pub fn write_str(&mut self, s: &str) {
        let mut segments = s.split('\n').peekable();
        while let Some(segment) = segments.next() {
            if !segment.is_empty() {
                if self.cursor_line < self.rows {
                    self.lines[self.cursor_line].fragments.push(TextFragment {
                        start_column: self.cursor_column,
                        priority: self.next_priority,
                        foreground: self.foreground,
                        background: self.background,
                        text: segment.to_string(),
                    });
                } else {
                    warn!(
                        line = self.cursor_line,
                        rows = self.rows,
                        "discarding write below the bottom row"
                    );
                }
                self.cursor_column += segment.chars().count();
            }
            if segments.peek().is_some() {
                self.cursor_line += 1;
                self.cursor_column = 0;
            }
        }
        self.next_priority += 1;
    }

    /// Move the cursor. Fragments already written are unaffected.
    pub fn move_cursor(&mut self, line: usize, column: usize) {
        debug_assert!(line < self.rows, "cursor line {line} out of {} rows", self.rows);
        self.cursor_line = line;
        self.cursor_column = column;
    }

    /// Change the colors applied to subsequent writes only.
    pub fn set_color(&mut self, foreground: Color, background: Color) {
        self.foreground = foreground;
        self.background = background;
    }

    /// Compose the current state into a frame.
    ///
    /// Pure and repeatable: flushing twice without intervening writes yields
    /// identical output. Fragments of each row are overlaid in
    /// `(start_column, priority)` order, so a later-starting fragment paints
    /// over an earlier one, and at equal start columns the more recent
    /// write wins.
    pub fn flush(&self) -> (Frame, Caret) {
        let mut frame = Frame::blank(self.columns, self.rows);

        for (line_index, line) in self.lines.iter().enumerate() {
            let mut ordered: Vec<&TextFragment> = line.fragments.iter().collect();
            ordered.sort_unstable_by_key(|f| (f.start_column, f.priority));

            for fragment in ordered {
                for (offset, ch) in fragment.text.chars().enumerate() {
                    let column = fragment.start_column + offset;
                    if column >= self.columns {
                        break;
                    }
                    *frame.cell_mut(line_index, column) = Cell {
                        ch,
                        foreground: fragment.foreground,
                        background: fragment.background,
                    };
                }
            }
        }

        (frame, self.cursor())
    }

    /// Deep copy of the full state for persistence.
    pub fn snapshot(&self) -> CompositorSnapshot {
        CompositorSnapshot {
            columns: self.columns,
            rows: self.rows,
            lines: self.lines.clone(),
            cursor_line: self.cursor_line,
            cursor_column: self.cursor_column,
            next_priority: self.next_priority,
            foreground: self.foreground,
            background: self.background,
        }
    }
}
