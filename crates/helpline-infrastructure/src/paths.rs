//! Path management for helpline client files.
//!
//! All configuration and draft data lives under the platform config
//! directory (e.g. `~/.config/helpline/` on Linux).

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for helpline.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/helpline/          # Config directory
/// ├── config.toml              # Application configuration
/// └── draft.json               # The single draft slot
/// ```
pub struct HelplinePaths;

impl HelplinePaths {
    /// Returns the helpline configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/helpline/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("helpline"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the draft slot.
    pub fn draft_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("draft.json"))
    }
}
