//! Configuration service implementation.
//!
//! Loads [`ChatConfig`] from `~/.config/tubechat/config.toml` and applies
//! environment overrides.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tubechat_core::config::ChatConfig;
use tubechat_core::error::{ChatError, Result};

use crate::paths::TubechatPaths;

/// Environment variable that overrides `gemini.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit config path; the platform default is used when `None`.
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<ChatConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the platform config file.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading `path` instead of the platform default.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading it on first access.
    ///
    /// A missing file yields defaults. `GEMINI_API_KEY`, when set and
    /// non-empty, replaces the configured API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn get_config(&self) -> Result<ChatConfig> {
        if let Some(cached) = self
            .config
            .read()
            .map_err(|_| ChatError::internal("config cache lock poisoned"))?
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let mut loaded = self.load_config()?;
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            loaded.gemini.api_key = Some(key);
        }

        *self
            .config
            .write()
            .map_err(|_| ChatError::internal("config cache lock poisoned"))? = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut cached) = self.config.write() {
            *cached = None;
        }
    }

    /// Path of the config file this service reads.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => TubechatPaths::config_file().map_err(|e| ChatError::config(e.to_string())),
        }
    }

    /// Resolves the transcript store path from the config, falling back to
    /// the platform data directory.
    pub fn transcript_store_path(&self, config: &ChatConfig) -> Result<PathBuf> {
        match &config.transcripts.path {
            Some(path) => Ok(path.clone()),
            None => {
                TubechatPaths::transcript_store().map_err(|e| ChatError::config(e.to_string()))
            }
        }
    }

    fn load_config(&self) -> Result<ChatConfig> {
        let path = self.config_path()?;
        if !path.exists() {
            tracing::debug!(
                "[ConfigService] No config at {}; using defaults",
                path.display()
            );
            return Ok(ChatConfig::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = toml::from_str(&content)?;
        tracing::info!("[ConfigService] Loaded config from {}", path.display());
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tubechat_core::config::DEFAULT_GEMINI_MODEL;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        let config = service.get_config().expect("Should fall back to defaults");
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.chat, ChatConfig::default().chat);
    }

    #[test]
    fn test_loads_and_caches_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[gemini]\nmodel = \"gemini-1.5-pro\"\n\n[transcripts]\npath = \"/tmp/t.json\"\n",
        )
        .unwrap();

        let service = ConfigService::with_path(&path);
        let config = service.get_config().unwrap();
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert_eq!(
            service.transcript_store_path(&config).unwrap(),
            PathBuf::from("/tmp/t.json")
        );

        // Cached until invalidated.
        std::fs::write(&path, "[gemini]\nmodel = \"other\"\n").unwrap();
        assert_eq!(service.get_config().unwrap().gemini.model, "gemini-1.5-pro");
        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().gemini.model, "other");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[gemini\nmodel = ").unwrap();

        let err = ConfigService::with_path(&path).get_config().unwrap_err();
        assert!(err.is_serialization());
    }
}
