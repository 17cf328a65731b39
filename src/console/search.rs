//! Incremental history search
//!
//! When Up/Down is pressed on a non-empty live line, navigation narrows to
//! history entries sharing the line's prefix instead of stepping one entry
//! at a time. The prefix is captured the first time Up/Down is pressed on a
//! non-empty, non-matching line and cleared when the line empties or a
//! command executes.

use crate::history::HistoryDirection;

/// Result of one prefix-narrowed navigation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep {
    /// Move the cursor to this entry index
    Entry(usize),
    /// Moved down past the newest match: return to the live line, restoring
    /// the captured prefix
    LiveLine,
    /// No further match in this direction; stay put
    Stay,
}

/// Prefix capture for history navigation.
#[derive(Debug, Default)]
pub struct IncrementalHistorySearch {
    prefix: Option<String>,
}

impl IncrementalHistorySearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active prefix for a live line, capturing it when the line does
    /// not match the previously captured one
    pub fn prefix_for(&mut self, live: &str) -> String {
        match &self.prefix {
            Some(p) if live.starts_with(p.as_str()) => p.clone(),
            _ => {
                self.prefix = Some(live.to_string());
                live.to_string()
            }
        }
    }

    /// The captured prefix when a search session is in progress and the live
    /// line still matches it; `None` otherwise
    pub fn active_prefix(&self, live: &str) -> Option<String> {
        self.prefix
            .as_ref()
            .filter(|p| live.starts_with(p.as_str()))
            .cloned()
    }

    /// Drop the captured prefix (line emptied or a command executed)
    pub fn clear(&mut self) {
        self.prefix = None;
    }

    /// Find the next entry sharing `prefix`, starting from cursor position
    /// `from` (−1 = live line) in `direction`
    pub fn find(
        &self,
        entries: &[String],
        from: isize,
        direction: HistoryDirection,
        prefix: &str,
    ) -> SearchStep {
        let len = entries.len() as isize;
        match direction {
            HistoryDirection::Up => {
                let start = if from < 0 { len - 1 } else { from - 1 };
                let mut i = start;
                while i >= 0 {
                    if entries[i as usize].starts_with(prefix) {
                        return SearchStep::Entry(i as usize);
                    }
                    i -= 1;
                }
                SearchStep::Stay
            }
            HistoryDirection::Down => {
                if from < 0 {
                    return SearchStep::Stay;
                }
                let mut i = from + 1;
                while i < len {
                    if entries[i as usize].starts_with(prefix) {
                        return SearchStep::Entry(i as usize);
                    }
                    i += 1;
                }
                SearchStep::LiveLine
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_up_finds_newest_matching_entry() {
        let search = IncrementalHistorySearch::new();
        let list = entries(&["print(1)", "x = 2", "print(3)", "y = 4"]);

        assert_eq!(
            search.find(&list, -1, HistoryDirection::Up, "print"),
            SearchStep::Entry(2)
        );
        assert_eq!(
            search.find(&list, 2, HistoryDirection::Up, "print"),
            SearchStep::Entry(0)
        );
        // No older match: stay
        assert_eq!(
            search.find(&list, 0, HistoryDirection::Up, "print"),
            SearchStep::Stay
        );
    }

    #[test]
    fn test_down_returns_to_live_line_past_newest_match() {
        let search = IncrementalHistorySearch::new();
        let list = entries(&["print(1)", "x = 2", "print(3)"]);

        assert_eq!(
            search.find(&list, 0, HistoryDirection::Down, "print"),
            SearchStep::Entry(2)
        );
        assert_eq!(
            search.find(&list, 2, HistoryDirection::Down, "print"),
            SearchStep::LiveLine
        );
        assert_eq!(
            search.find(&list, -1, HistoryDirection::Down, "print"),
            SearchStep::Stay
        );
    }

    #[test]
    fn test_prefix_captured_once_while_line_matches() {
        let mut search = IncrementalHistorySearch::new();
        assert_eq!(search.prefix_for("pri"), "pri");
        // Navigated to "print(1)": the line still matches the prefix
        assert_eq!(search.prefix_for("print(1)"), "pri");
        // A different line re-captures
        assert_eq!(search.prefix_for("x ="), "x =");
    }

    #[test]
    fn test_active_prefix_requires_matching_line() {
        let mut search = IncrementalHistorySearch::new();
        assert_eq!(search.active_prefix("pri"), None);

        search.prefix_for("pri");
        assert_eq!(search.active_prefix("print(1)"), Some("pri".to_string()));
        assert_eq!(search.active_prefix("x = 2"), None);
    }

    #[test]
    fn test_clear_drops_prefix() {
        let mut search = IncrementalHistorySearch::new();
        search.prefix_for("pri");
        search.clear();
        assert_eq!(search.prefix_for("print(1)"), "print(1)");
    }
}
