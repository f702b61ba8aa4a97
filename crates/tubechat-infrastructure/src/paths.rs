//! Unified path management for tubechat configuration and data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/tubechat/          # Config directory
//! └── config.toml              # Application configuration
//!
//! ~/.local/share/tubechat/     # Data directory
//! └── transcripts.json         # Captured transcripts
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "tubechat";
const CONFIG_FILE: &str = "config.toml";
const TRANSCRIPTS_FILE: &str = "transcripts.json";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Config directory could not be determined.
    ConfigDirNotFound,
    /// Data directory could not be determined.
    DataDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
            PathError::DataDirNotFound => write!(f, "Cannot find data directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Platform paths for tubechat (XDG on Linux, the native locations elsewhere).
pub struct TubechatPaths;

impl TubechatPaths {
    /// Returns the tubechat configuration directory (e.g. `~/.config/tubechat/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the tubechat data directory (e.g. `~/.local/share/tubechat/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DataDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Default location of the JSON transcript store.
    pub fn transcript_store() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join(TRANSCRIPTS_FILE))
    }
}
