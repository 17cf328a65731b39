//! Configuration for remcon.
//!
//! All tunables are plain constructor data: the host builds a
//! `ConsoleConfig` (optionally from `~/.remcon/config.toml`) and hands it to
//! the console. There is no settings singleton.
//!
//! # Configuration File
//!
//! ```toml
//! ps1 = ">>> "
//! ps2 = "... "
//!
//! # Wall-clock bound on waiting for backend acknowledgement
//! exec_timeout_ms = 3000
//! poll_interval_ms = 5
//!
//! history_capacity = 1000
//! # history style: disabled, linux, windows
//! history_style = "linux"
//!
//! environments = ["default", "py311"]
//! windowed = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};
use crate::history::{HistoryStyle, DEFAULT_HISTORY_CAPACITY};

/// Console configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Primary prompt
    pub ps1: String,
    /// Continuation prompt
    pub ps2: String,
    /// Wall-clock bound for the submitted-waiting state, in milliseconds
    pub exec_timeout_ms: u64,
    /// Sleep between event-pump iterations while waiting, in milliseconds
    pub poll_interval_ms: u64,
    /// Maximum history entries per session type
    pub history_capacity: usize,
    /// History navigation style
    pub history_style: HistoryStyle,
    /// Environment names offered by `%envs` and accepted by `%start`
    pub environments: Vec<String>,
    /// Whether the console runs inside a window of its own (`%quit` is only
    /// honored in windowed mode)
    pub windowed: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            ps1: ">>> ".to_string(),
            ps2: "... ".to_string(),
            exec_timeout_ms: 3000,
            poll_interval_ms: 5,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            history_style: HistoryStyle::default(),
            environments: Vec::new(),
            windowed: false,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a specific file, falling back to defaults on
    /// any read or parse failure
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(config) = toml::from_str(&content) {
                    return config;
                }
            }
        }
        Self::default()
    }

    /// Load configuration from `~/.remcon/config.toml`
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Save configuration to `~/.remcon/config.toml`
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| ConsoleError::Config("could not determine config path".to_string()))?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConsoleError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| ConsoleError::Config(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Get config file path
    fn config_path() -> Option<PathBuf> {
        config_dir().map(|d| d.join("config.toml"))
    }
}

/// Per-user config directory (`~/.remcon`), created on demand
pub fn config_dir() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let dir = home.join(".remcon");
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        return Some(dir);
    }
    None
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
