//! Line-editing discipline
//!
//! Only the trailing "live" line of the surface is editable, and the prompt
//! prefix on that line can never be erased: every left-movement and deletion
//! clamps at the prompt boundary. Selections are clamped to the same
//! editable region before paste or deletion touches them.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::surface::{Position, TextSurface};

/// What the console should do after a key was offered to the discipline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// The key was applied to the live line
    Consumed,
    /// Enter on the live line: run the submit cycle
    Submit,
    /// Up arrow: history navigation
    HistoryUp,
    /// Down arrow: history navigation
    HistoryDown,
    /// Tab: request completion for the live line
    Complete,
    /// Not an editing key
    Ignored,
}

/// Prompt-aware editing rules for the live line.
pub struct LineEditingDiscipline {
    ps1: String,
    ps2: String,
}

impl LineEditingDiscipline {
    pub fn new(ps1: &str, ps2: &str) -> Self {
        Self {
            ps1: ps1.to_string(),
            ps2: ps2.to_string(),
        }
    }

    /// Length in characters of the active prompt prefix
    fn prompt_len(&self, continuation: bool) -> usize {
        if continuation {
            self.ps2.chars().count()
        } else {
            self.ps1.chars().count()
        }
    }

    /// The live line index and the leftmost editable column on it
    pub fn boundary(&self, surface: &dyn TextSurface, continuation: bool) -> (usize, usize) {
        let live = surface.line_count().saturating_sub(1);
        let prompt = self.prompt_len(continuation);
        let len = surface.line_text(live).chars().count();
        (live, prompt.min(len))
    }

    /// Text of the live line with the prompt prefix removed
    pub fn live_text(&self, surface: &dyn TextSurface, continuation: bool) -> String {
        let (live, min_col) = self.boundary(surface, continuation);
        surface.line_text(live).chars().skip(min_col).collect()
    }

    /// Replace everything after the prompt on the live line with `text`
    pub fn set_live_text(&self, surface: &mut dyn TextSurface, continuation: bool, text: &str) {
        let (live, min_col) = self.boundary(surface, continuation);
        let len = surface.line_text(live).chars().count();
        surface.replace_range((live, min_col), (live, len), text);
    }

    /// Insert text (no newlines) at the cursor, clamped to the live line
    pub fn insert_text(&self, surface: &mut dyn TextSurface, continuation: bool, text: &str) {
        let (live, min_col) = self.boundary(surface, continuation);
        let len = surface.line_text(live).chars().count();
        let (line, col) = surface.cursor_position();
        let col = if line == live {
            col.clamp(min_col, len)
        } else {
            len
        };
        surface.replace_range((live, col), (live, col), text);
    }

    /// Clamp a selection to the editable region of the live line
    fn clamp_selection(
        &self,
        surface: &dyn TextSurface,
        continuation: bool,
        start: Position,
        end: Position,
    ) -> (Position, Position) {
        let (live, min_col) = self.boundary(surface, continuation);
        let len = surface.line_text(live).chars().count();
        let clamp = |pos: Position| -> Position {
            if pos.0 < live {
                (live, min_col)
            } else {
                (live, pos.1.clamp(min_col, len))
            }
        };
        let (mut a, mut b) = (clamp(start), clamp(end));
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        (a, b)
    }

    /// Delete the current selection, clamped to the editable region.
    /// Returns true when something was removed.
    pub fn delete_selection(&self, surface: &mut dyn TextSurface, continuation: bool) -> bool {
        let Some((start, end)) = surface.selection() else {
            return false;
        };
        let (start, end) = self.clamp_selection(surface, continuation, start, end);
        surface.clear_selection();
        if start == end {
            return false;
        }
        surface.replace_range(start, end, "");
        true
    }

    /// Apply an editing key to the live line
    pub fn handle_key(
        &self,
        surface: &mut dyn TextSurface,
        continuation: bool,
        key: &KeyEvent,
    ) -> EditOutcome {
        let (live, min_col) = self.boundary(surface, continuation);
        let len = surface.line_text(live).chars().count();

        // Editing anywhere above the live line jumps to its end first
        let (line, col) = surface.cursor_position();
        let col = if line == live {
            col.clamp(min_col, len)
        } else {
            surface.set_cursor_position(live, len);
            len
        };

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::Enter => EditOutcome::Submit,
            KeyCode::Up => EditOutcome::HistoryUp,
            KeyCode::Down => EditOutcome::HistoryDown,
            KeyCode::Tab => EditOutcome::Complete,

            // Delete to start of line, clamped at the prompt
            KeyCode::Char('u') if ctrl => {
                surface.replace_range((live, min_col), (live, col), "");
                EditOutcome::Consumed
            }

            // Delete to end of line
            KeyCode::Char('k') if ctrl => {
                surface.delete_line_right();
                EditOutcome::Consumed
            }

            // Delete previous word, clamped at the prompt
            KeyCode::Char('w') if ctrl => {
                let start = Self::word_start(&surface.line_text(live), col, min_col);
                surface.replace_range((live, start), (live, col), "");
                EditOutcome::Consumed
            }
            KeyCode::Backspace if ctrl || alt => {
                let start = Self::word_start(&surface.line_text(live), col, min_col);
                surface.replace_range((live, start), (live, col), "");
                EditOutcome::Consumed
            }

            KeyCode::Backspace => {
                if self.delete_selection(surface, continuation) {
                    return EditOutcome::Consumed;
                }
                if col > min_col {
                    surface.replace_range((live, col - 1), (live, col), "");
                }
                EditOutcome::Consumed
            }

            KeyCode::Delete => {
                if self.delete_selection(surface, continuation) {
                    return EditOutcome::Consumed;
                }
                if col < len {
                    surface.replace_range((live, col), (live, col + 1), "");
                }
                EditOutcome::Consumed
            }

            KeyCode::Left => {
                surface.set_cursor_position(live, col.saturating_sub(1).max(min_col));
                EditOutcome::Consumed
            }
            KeyCode::Right => {
                surface.set_cursor_position(live, (col + 1).min(len));
                EditOutcome::Consumed
            }
            KeyCode::Home => {
                surface.set_cursor_position(live, min_col);
                EditOutcome::Consumed
            }
            KeyCode::End => {
                surface.set_cursor_position(live, len);
                EditOutcome::Consumed
            }

            KeyCode::Char(ch) if !ctrl && !alt => {
                self.delete_selection(surface, continuation);
                let (live, min_col) = self.boundary(surface, continuation);
                let len = surface.line_text(live).chars().count();
                let (_, col) = surface.cursor_position();
                let col = col.clamp(min_col, len);
                let mut buf = [0u8; 4];
                surface.replace_range((live, col), (live, col), ch.encode_utf8(&mut buf));
                EditOutcome::Consumed
            }

            _ => EditOutcome::Ignored,
        }
    }

    /// Start of the word preceding `col`, never left of `min_col`
    fn word_start(line: &str, col: usize, min_col: usize) -> usize {
        let chars: Vec<char> = line.chars().collect();
        let mut i = col.min(chars.len());
        while i > min_col && chars[i - 1].is_whitespace() {
            i -= 1;
        }
        while i > min_col && !chars[i - 1].is_whitespace() {
            i -= 1;
        }
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::BufferSurface;

    fn discipline() -> LineEditingDiscipline {
        LineEditingDiscipline::new(">>> ", "... ")
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn surface_with(text: &str) -> BufferSurface {
        let mut s = BufferSurface::new();
        s.insert_at_end(text);
        s
    }

    #[test]
    fn test_typing_appends_after_prompt() {
        let d = discipline();
        let mut s = surface_with(">>> ");
        for ch in "ab".chars() {
            d.handle_key(&mut s, false, &key(KeyCode::Char(ch)));
        }
        assert_eq!(s.line_text(0), ">>> ab");
        assert_eq!(d.live_text(&s, false), "ab");
    }

    #[test]
    fn test_backspace_never_deletes_prompt() {
        let d = discipline();
        let mut s = surface_with(">>> x");
        assert_eq!(
            d.handle_key(&mut s, false, &key(KeyCode::Backspace)),
            EditOutcome::Consumed
        );
        assert_eq!(s.line_text(0), ">>> ");

        // At the boundary, backspace is a no-op
        for _ in 0..3 {
            d.handle_key(&mut s, false, &key(KeyCode::Backspace));
        }
        assert_eq!(s.line_text(0), ">>> ");
    }

    #[test]
    fn test_left_and_home_clamp_at_prompt() {
        let d = discipline();
        let mut s = surface_with(">>> ab");
        d.handle_key(&mut s, false, &key(KeyCode::Home));
        assert_eq!(s.cursor_position(), (0, 4));

        for _ in 0..5 {
            d.handle_key(&mut s, false, &key(KeyCode::Left));
        }
        assert_eq!(s.cursor_position(), (0, 4));
    }

    #[test]
    fn test_delete_line_left_clamps_at_prompt() {
        let d = discipline();
        let mut s = surface_with(">>> abc");
        d.handle_key(&mut s, false, &ctrl('u'));
        assert_eq!(s.line_text(0), ">>> ");
    }

    #[test]
    fn test_delete_word_clamps_at_prompt() {
        let d = discipline();
        let mut s = surface_with(">>> one two");
        d.handle_key(&mut s, false, &ctrl('w'));
        assert_eq!(s.line_text(0), ">>> one ");
        d.handle_key(&mut s, false, &ctrl('w'));
        assert_eq!(s.line_text(0), ">>> ");
        d.handle_key(&mut s, false, &ctrl('w'));
        assert_eq!(s.line_text(0), ">>> ");
    }

    #[test]
    fn test_continuation_prompt_boundary() {
        let d = discipline();
        let mut s = surface_with(">>> for i in x:\n...     pass");
        d.handle_key(&mut s, true, &ctrl('u'));
        assert_eq!(s.line_text(1), "... ");
        // The ps1 line above is untouched
        assert_eq!(s.line_text(0), ">>> for i in x:");
    }

    #[test]
    fn test_editing_above_live_line_jumps_to_end() {
        let d = discipline();
        let mut s = surface_with("old output\n>>> ab");
        s.set_cursor_position(0, 3);
        d.handle_key(&mut s, false, &key(KeyCode::Char('c')));
        assert_eq!(s.line_text(0), "old output");
        assert_eq!(s.line_text(1), ">>> abc");
    }

    #[test]
    fn test_selection_clamped_to_live_region() {
        let d = discipline();
        let mut s = surface_with("output\n>>> hello");
        // Selection reaching into previous lines and the prompt
        s.set_selection((0, 2), (1, 9));
        assert!(d.delete_selection(&mut s, false));
        assert_eq!(s.line_text(0), "output");
        assert_eq!(s.line_text(1), ">>> ");
    }

    #[test]
    fn test_selection_entirely_outside_live_region() {
        let d = discipline();
        let mut s = surface_with("output\n>>> hello");
        s.set_selection((0, 0), (0, 4));
        assert!(!d.delete_selection(&mut s, false));
        assert_eq!(s.line_text(0), "output");
    }

    #[test]
    fn test_set_live_text_replaces_after_prompt() {
        let d = discipline();
        let mut s = surface_with(">>> old text");
        d.set_live_text(&mut s, false, "new");
        assert_eq!(s.line_text(0), ">>> new");
    }
}
