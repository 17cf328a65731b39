//! Display surface boundary
//!
//! The console never renders anything itself; it drives a host-provided
//! `TextSurface` through line/column text addressing. Positions are
//! `(line, col)` pairs where `col` counts characters from the start of the
//! line.

/// A `(line, col)` position on the surface, in character units.
pub type Position = (usize, usize);

/// Display surface capability consumed by the console.
pub trait TextSurface {
    /// Append text at the very end of the surface. Embedded newlines start
    /// new lines.
    fn insert_at_end(&mut self, text: &str);

    /// Current cursor position
    fn cursor_position(&self) -> Position;

    /// Move the cursor
    fn set_cursor_position(&mut self, line: usize, col: usize);

    /// Current selection as (start, end), or `None` when nothing is selected
    fn selection(&self) -> Option<(Position, Position)>;

    /// Set the selection
    fn set_selection(&mut self, start: Position, end: Position);

    /// Drop any selection
    fn clear_selection(&mut self);

    /// Number of lines on the surface (always at least 1)
    fn line_count(&self) -> usize;

    /// Text of line `n`, without a trailing newline
    fn line_text(&self, n: usize) -> String;

    /// Delete from the cursor to the end of the cursor's line
    fn delete_line_right(&mut self);

    /// Scroll so that `line` is visible
    fn ensure_visible(&mut self, line: usize);

    /// Replace the text between `start` and `end` with `text`, leaving the
    /// cursor at the end of the inserted text
    fn replace_range(&mut self, start: Position, end: Position, text: &str);
}

/// In-memory surface backed by a line buffer.
///
/// Used by the test suite and as the bookkeeping half of the demo front-end.
/// Every `insert_at_end` call is recorded verbatim in `inserts` so tests can
/// assert on coalescing behavior.
#[derive(Debug)]
pub struct BufferSurface {
    lines: Vec<String>,
    cursor: Position,
    selection: Option<(Position, Position)>,
    /// Verbatim log of `insert_at_end` calls
    pub inserts: Vec<String>,
    last_visible: usize,
}

impl Default for BufferSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferSurface {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor: (0, 0),
            selection: None,
            inserts: Vec::new(),
            last_visible: 0,
        }
    }

    /// Full surface contents joined with newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn line_len(&self, n: usize) -> usize {
        self.lines.get(n).map(|l| l.chars().count()).unwrap_or(0)
    }

    /// Clamp a position to valid line/column bounds
    fn clamp(&self, pos: Position) -> Position {
        let line = pos.0.min(self.lines.len() - 1);
        let col = pos.1.min(self.line_len(line));
        (line, col)
    }

    fn byte_index(line: &str, col: usize) -> usize {
        line.char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    }
}

impl TextSurface for BufferSurface {
    fn insert_at_end(&mut self, text: &str) {
        self.inserts.push(text.to_string());
        let mut first = true;
        for part in text.split('\n') {
            if first {
                first = false;
                if let Some(last) = self.lines.last_mut() {
                    last.push_str(part);
                }
            } else {
                self.lines.push(part.to_string());
            }
        }
        let line = self.lines.len() - 1;
        self.cursor = (line, self.line_len(line));
    }

    fn cursor_position(&self) -> Position {
        self.cursor
    }

    fn set_cursor_position(&mut self, line: usize, col: usize) {
        self.cursor = self.clamp((line, col));
    }

    fn selection(&self) -> Option<(Position, Position)> {
        self.selection
    }

    fn set_selection(&mut self, start: Position, end: Position) {
        self.selection = Some((self.clamp(start), self.clamp(end)));
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_text(&self, n: usize) -> String {
        self.lines.get(n).cloned().unwrap_or_default()
    }

    fn delete_line_right(&mut self) {
        let (line, col) = self.cursor;
        if let Some(text) = self.lines.get_mut(line) {
            let idx = Self::byte_index(text, col);
            text.truncate(idx);
        }
    }

    fn ensure_visible(&mut self, line: usize) {
        self.last_visible = line;
    }

    fn replace_range(&mut self, start: Position, end: Position, text: &str) {
        let (sl, sc) = self.clamp(start);
        let (el, ec) = self.clamp(end);
        if (sl, sc) > (el, ec) {
            return;
        }

        let start_line = &self.lines[sl];
        let mut head: String = start_line[..Self::byte_index(start_line, sc)].to_string();
        let end_line = &self.lines[el];
        let tail: String = end_line[Self::byte_index(end_line, ec)..].to_string();

        head.push_str(text);
        // Cursor lands at the end of the inserted text
        let cursor_line = sl + text.matches('\n').count();
        let cursor_col = match text.rfind('\n') {
            Some(i) => text[i + 1..].chars().count(),
            None => sc + text.chars().count(),
        };
        head.push_str(&tail);

        let replacement: Vec<String> = head.split('\n').map(|s| s.to_string()).collect();
        self.lines.splice(sl..=el, replacement);
        self.cursor = self.clamp((cursor_line, cursor_col));
        self.selection = None;
    }
}
