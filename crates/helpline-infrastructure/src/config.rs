//! Application configuration.
//!
//! Loaded from `~/.config/helpline/config.toml`. A missing file or missing
//! fields fall back to defaults, which mirror the browser client's
//! socket settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use helpline_core::error::{HelplineError, Result};

use crate::paths::HelplinePaths;

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// WebSocket endpoint of the support backend.
    pub socket_url: String,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub reconnect_attempts: u32,
    /// Initial delay between reconnection attempts, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Upper bound for the reconnection backoff, in milliseconds.
    pub reconnect_delay_max_ms: u64,
    /// Timeout for a single connection attempt, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Retract a pending "thinking" placeholder after this many
    /// milliseconds. Absent keeps the stock behavior: a placeholder with
    /// no response stays until the next send or reload.
    pub placeholder_timeout_ms: Option<u64>,
    /// Override for the draft slot location.
    pub draft_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            socket_url: "ws://localhost:8000/ws".to_string(),
            reconnect_attempts: 10,
            reconnect_delay_ms: 500,
            reconnect_delay_max_ms: 2_000,
            connect_timeout_ms: 20_000,
            placeholder_timeout_ms: None,
            draft_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the default location.
    ///
    /// A missing file yields the defaults; an unparsable file is an error
    /// (a broken config should be noticed, unlike a broken draft).
    pub fn load() -> Result<Self> {
        let path = HelplinePaths::config_file()
            .map_err(|e| HelplineError::config(e.to_string()))?;
        Self::load_from(&path)
    }

    /// Loads the configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Placeholder timeout as a `Duration`, when configured.
    pub fn placeholder_timeout(&self) -> Option<Duration> {
        self.placeholder_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.placeholder_timeout().is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "socket_url = \"ws://support.example.com/ws\"\nplaceholder_timeout_ms = 30000\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.socket_url, "ws://support.example.com/ws");
        assert_eq!(config.reconnect_attempts, 10);
        assert_eq!(config.placeholder_timeout(), Some(Duration::from_millis(30_000)));
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "socket_url = [broken").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }
}
