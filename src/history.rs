//! Command history for remcon
//!
//! Stores past commands per session type with bounded capacity, provides
//! three navigation styles, and persists through an externally supplied
//! key-value store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::store::KeyValueStore;

/// Default maximum number of history entries per session type
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Navigation direction through history. `Up` walks toward older entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryDirection {
    Up,
    Down,
}

/// Policy governing whether/how the navigation cursor persists.
///
/// - `Disabled`: Up/Down never recall history.
/// - `Linux`: the cursor resets to the live line after every executed command.
/// - `Windows`: the cursor persists across executions and process restarts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryStyle {
    Disabled,
    #[default]
    Linux,
    Windows,
}

/// Navigation cursor. `index == -1` means "not navigating" (live line);
/// otherwise it is a position into the entry list, newest at `len - 1`.
#[derive(Clone, Copy, Debug)]
pub struct HistoryCursor {
    pub index: isize,
    pub style: HistoryStyle,
}

/// Per-session-type command history with bounded capacity.
pub struct HistoryStore {
    lists: HashMap<String, Vec<String>>,
    cursor: HistoryCursor,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize, style: HistoryStyle) -> Self {
        Self {
            lists: HashMap::new(),
            cursor: HistoryCursor { index: -1, style },
            capacity: capacity.max(1),
        }
    }

    /// Entries for a session type, oldest first
    pub fn get(&self, session_type_id: &str) -> &[String] {
        self.lists
            .get(session_type_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn index(&self) -> isize {
        self.cursor.index
    }

    pub fn set_index(&mut self, index: isize) {
        self.cursor.index = index;
    }

    pub fn style(&self) -> HistoryStyle {
        self.cursor.style
    }

    /// Append a command. Empty commands and commands equal to the most
    /// recent entry for that session type are skipped; the oldest entry is
    /// evicted once capacity is exceeded.
    pub fn append(&mut self, session_type_id: &str, cmd: &str) {
        let trimmed = cmd.trim();
        if trimmed.is_empty() {
            return;
        }

        let list = self.lists.entry(session_type_id.to_string()).or_default();
        if list.last().map(|s| s.as_str()) == Some(trimmed) {
            return;
        }

        list.push(trimmed.to_string());
        while list.len() > self.capacity {
            list.remove(0);
        }
    }

    /// Move the cursor by one entry and return the entry it now points at.
    ///
    /// Returns `None` when navigation is disabled, the list is empty, or the
    /// cursor landed back on the live line (`index == -1`). Without `wrap`
    /// the cursor saturates at the oldest entry, and moving down past the
    /// newest entry returns to the live line. With `wrap`, moving past
    /// either end cycles to the opposite end.
    pub fn navigate(
        &mut self,
        session_type_id: &str,
        direction: HistoryDirection,
        wrap: bool,
    ) -> Option<String> {
        if self.cursor.style == HistoryStyle::Disabled {
            return None;
        }
        let list = self.lists.get(session_type_id)?;
        if list.is_empty() {
            return None;
        }
        let newest = list.len() as isize - 1;

        let index = self.cursor.index;
        self.cursor.index = match direction {
            HistoryDirection::Up => {
                if index == -1 {
                    newest
                } else if index == 0 {
                    if wrap {
                        newest
                    } else {
                        0
                    }
                } else {
                    index - 1
                }
            }
            HistoryDirection::Down => {
                if index == -1 {
                    if wrap {
                        0
                    } else {
                        -1
                    }
                } else if index == newest {
                    if wrap {
                        0
                    } else {
                        -1
                    }
                } else {
                    index + 1
                }
            }
        };

        if self.cursor.index < 0 {
            return None;
        }
        list.get(self.cursor.index as usize).cloned()
    }

    /// Treat `cmd` as the entry at the current cursor without appending it
    /// to the list. Used by manual history picking; editing resumes on the
    /// live line.
    pub fn select(&mut self, cmd: &str) -> String {
        self.cursor.index = -1;
        cmd.to_string()
    }

    /// Empty the list for a session type and reset the cursor
    pub fn clear(&mut self, session_type_id: &str) {
        self.lists.remove(session_type_id);
        self.cursor.index = -1;
    }

    /// Apply the post-execution cursor policy
    pub fn after_execute(&mut self) {
        if self.cursor.style == HistoryStyle::Linux {
            self.cursor.index = -1;
        }
    }

    /// Persist the list (and, for the Windows style, the cursor index) for a
    /// session type. Best-effort; the store decides what failure means.
    pub fn save(&self, store: &mut dyn KeyValueStore, session_type_id: &str) {
        let list = self.get(session_type_id).to_vec();
        store.set_list(&format!("history/{}", session_type_id), &list);
        if self.cursor.style == HistoryStyle::Windows {
            store.set_int(
                &format!("historyIndex/{}", session_type_id),
                self.cursor.index as i64,
            );
        }
    }

    /// Load the list for a session type, capping at capacity (newest kept).
    /// A missing or unreadable list defaults to empty.
    pub fn load(&mut self, store: &dyn KeyValueStore, session_type_id: &str) {
        let mut list = store
            .get_list(&format!("history/{}", session_type_id))
            .unwrap_or_default();
        if list.len() > self.capacity {
            list.drain(..list.len() - self.capacity);
        }

        if self.cursor.style == HistoryStyle::Windows {
            let stored = store
                .get_int(&format!("historyIndex/{}", session_type_id))
                .unwrap_or(-1) as isize;
            let newest = list.len() as isize - 1;
            self.cursor.index = if stored < -1 || stored > newest {
                -1
            } else {
                stored
            };
        } else {
            self.cursor.index = -1;
        }

        self.lists.insert(session_type_id.to_string(), list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store_with(entries: &[&str]) -> HistoryStore {
        let mut h = HistoryStore::new(DEFAULT_HISTORY_CAPACITY, HistoryStyle::Linux);
        for e in entries {
            h.append("python", e);
        }
        h
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mut h = HistoryStore::new(3, HistoryStyle::Linux);
        for i in 0..10 {
            h.append("python", &format!("cmd{}", i));
        }
        assert_eq!(h.get("python"), &["cmd7", "cmd8", "cmd9"]);
    }

    #[test]
    fn test_consecutive_duplicates_skipped() {
        let mut h = store_with(&["a", "a"]);
        assert_eq!(h.get("python"), &["a"]);

        // Non-consecutive duplicates are kept
        h.append("python", "b");
        h.append("python", "a");
        assert_eq!(h.get("python"), &["a", "b", "a"]);
    }

    #[test]
    fn test_empty_command_skipped() {
        let h = store_with(&["", "   "]);
        assert!(h.get("python").is_empty());
    }

    #[test]
    fn test_lists_keyed_by_session_type() {
        let mut h = store_with(&["py"]);
        h.append("lua", "lu");
        assert_eq!(h.get("python"), &["py"]);
        assert_eq!(h.get("lua"), &["lu"]);
    }

    #[test]
    fn test_navigate_saturating() {
        let mut h = store_with(&["a", "b", "c"]);

        // Up from the live line lands on the newest entry
        assert_eq!(
            h.navigate("python", HistoryDirection::Up, false).as_deref(),
            Some("c")
        );
        assert_eq!(
            h.navigate("python", HistoryDirection::Up, false).as_deref(),
            Some("b")
        );
        assert_eq!(
            h.navigate("python", HistoryDirection::Up, false).as_deref(),
            Some("a")
        );
        // Saturates at the oldest entry
        assert_eq!(
            h.navigate("python", HistoryDirection::Up, false).as_deref(),
            Some("a")
        );

        assert_eq!(
            h.navigate("python", HistoryDirection::Down, false).as_deref(),
            Some("b")
        );
        assert_eq!(
            h.navigate("python", HistoryDirection::Down, false).as_deref(),
            Some("c")
        );
        // Down past the newest returns to the live line
        assert_eq!(h.navigate("python", HistoryDirection::Down, false), None);
        assert_eq!(h.index(), -1);
    }

    #[test]
    fn test_navigate_wrapping() {
        let mut h = store_with(&["a", "b"]);

        assert_eq!(
            h.navigate("python", HistoryDirection::Up, true).as_deref(),
            Some("b")
        );
        assert_eq!(
            h.navigate("python", HistoryDirection::Up, true).as_deref(),
            Some("a")
        );
        // Past the oldest cycles to the newest
        assert_eq!(
            h.navigate("python", HistoryDirection::Up, true).as_deref(),
            Some("b")
        );
        // Past the newest cycles to the oldest
        assert_eq!(
            h.navigate("python", HistoryDirection::Down, true).as_deref(),
            Some("a")
        );
    }

    #[test]
    fn test_navigate_disabled() {
        let mut h = HistoryStore::new(10, HistoryStyle::Disabled);
        h.append("python", "a");
        assert_eq!(h.navigate("python", HistoryDirection::Up, false), None);
        assert_eq!(h.index(), -1);
    }

    #[test]
    fn test_linux_style_resets_after_execute() {
        let mut h = store_with(&["a", "b"]);
        h.navigate("python", HistoryDirection::Up, false);
        assert_eq!(h.index(), 1);
        h.after_execute();
        assert_eq!(h.index(), -1);
    }

    #[test]
    fn test_windows_style_keeps_index_after_execute() {
        let mut h = HistoryStore::new(10, HistoryStyle::Windows);
        h.append("python", "a");
        h.append("python", "b");
        h.navigate("python", HistoryDirection::Up, false);
        h.after_execute();
        assert_eq!(h.index(), 1);
    }

    #[test]
    fn test_persistence_roundtrip() {
        let mut kv = MemoryStore::new();
        let mut h = HistoryStore::new(10, HistoryStyle::Windows);
        h.append("python", "a");
        h.append("python", "b");
        h.navigate("python", HistoryDirection::Up, false);
        h.save(&mut kv, "python");

        let mut loaded = HistoryStore::new(10, HistoryStyle::Windows);
        loaded.load(&kv, "python");
        assert_eq!(loaded.get("python"), &["a", "b"]);
        // Windows style restores the navigation index from the store
        assert_eq!(loaded.index(), 1);
    }

    #[test]
    fn test_load_caps_at_capacity() {
        let mut kv = MemoryStore::new();
        let values: Vec<String> = (0..10).map(|i| format!("cmd{}", i)).collect();
        kv.set_list("history/python", &values);

        let mut h = HistoryStore::new(3, HistoryStyle::Linux);
        h.load(&kv, "python");
        assert_eq!(h.get("python"), &["cmd7", "cmd8", "cmd9"]);
    }

    #[test]
    fn test_load_missing_defaults_empty() {
        let kv = MemoryStore::new();
        let mut h = HistoryStore::new(3, HistoryStyle::Linux);
        h.load(&kv, "python");
        assert!(h.get("python").is_empty());
    }

    #[test]
    fn test_select_does_not_append() {
        let mut h = store_with(&["a"]);
        h.navigate("python", HistoryDirection::Up, false);
        let cmd = h.select("picked");
        assert_eq!(cmd, "picked");
        assert_eq!(h.get("python"), &["a"]);
        assert_eq!(h.index(), -1);
    }

    #[test]
    fn test_clear_resets_cursor() {
        let mut h = store_with(&["a", "b"]);
        h.navigate("python", HistoryDirection::Up, false);
        h.clear("python");
        assert!(h.get("python").is_empty());
        assert_eq!(h.index(), -1);
    }
}
