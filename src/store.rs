//! Key-value persistence boundary
//!
//! The console persists history lists and navigation indices through this
//! trait; the host decides where the data actually lives. Saves are
//! best-effort and load failures default to empty data.

use std::collections::HashMap;

/// Key-value store consumed by the console for history persistence.
///
/// Keys follow the convention `"history/<session_type_id>"` for lists and
/// `"historyIndex/<session_type_id>"` for navigation indices.
pub trait KeyValueStore {
    /// Get a list of strings, or `None` if the key is absent
    fn get_list(&self, key: &str) -> Option<Vec<String>>;

    /// Store a list of strings under a key
    fn set_list(&mut self, key: &str, values: &[String]);

    /// Get an integer, or `None` if the key is absent
    fn get_int(&self, key: &str) -> Option<i64>;

    /// Store an integer under a key
    fn set_int(&mut self, key: &str, value: i64);
}

/// In-memory store, used by tests and the demo front-end.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: HashMap<String, Vec<String>>,
    ints: HashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.lists.get(key).cloned()
    }

    fn set_list(&mut self, key: &str, values: &[String]) {
        self.lists.insert(key.to_string(), values.to_vec());
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.ints.get(key).copied()
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.ints.insert(key.to_string(), value);
    }
}
