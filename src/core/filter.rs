//! Control-sequence filter
//!
//! Strips ANSI/VT control sequences from backend output before it reaches
//! the display surface, and normalizes carriage returns to newlines. The
//! parser state survives across calls because output arrives as arbitrary
//! fragments; a sequence may be split between two `feed` calls.

/// Filter state machine
pub struct ControlSequenceFilter {
    state: FilterState,
    pending_cr: bool,
}

#[derive(Clone, Copy, Default, PartialEq)]
enum FilterState {
    #[default]
    Ground,
    Escape,
    Csi,
    Osc,
    /// ESC received within an OSC string, waiting for the terminator
    OscEscape,
}

impl Default for ControlSequenceFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlSequenceFilter {
    pub fn new() -> Self {
        Self {
            state: FilterState::Ground,
            pending_cr: false,
        }
    }

    /// Filter one fragment of inbound text
    pub fn feed(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            if self.state == FilterState::Ground && self.pending_cr {
                self.pending_cr = false;
                out.push('\n');
                if ch == '\n' {
                    continue;
                }
            }

            match self.state {
                FilterState::Ground => match ch {
                    '\u{1b}' => self.state = FilterState::Escape,
                    '\r' => self.pending_cr = true,
                    '\n' | '\t' => out.push(ch),
                    c if (c as u32) < 0x20 || c == '\u{7f}' => {}
                    c => out.push(c),
                },
                FilterState::Escape => match ch {
                    '[' => self.state = FilterState::Csi,
                    ']' => self.state = FilterState::Osc,
                    // Two-character escape, both dropped
                    _ => self.state = FilterState::Ground,
                },
                FilterState::Csi => {
                    // Final bytes are 0x40..=0x7E; everything before is
                    // parameters/intermediates
                    if ('\u{40}'..='\u{7e}').contains(&ch) {
                        self.state = FilterState::Ground;
                    }
                }
                FilterState::Osc => match ch {
                    '\u{07}' => self.state = FilterState::Ground,
                    '\u{1b}' => self.state = FilterState::OscEscape,
                    _ => {}
                },
                FilterState::OscEscape => {
                    if ch == '\\' {
                        self.state = FilterState::Ground;
                    } else {
                        self.state = FilterState::Osc;
                    }
                }
            }
        }
        out
    }
}
