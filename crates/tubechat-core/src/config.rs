//! Configuration model for tubechat.
//!
//! Loaded from `config.toml` by the infrastructure crate; every field has a
//! default so an empty or missing file yields a working configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::stream::{CredentialClassifier, DEFAULT_CREDENTIAL_MARKERS, FallbackMessages};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_GREETING: &str = "Hello! I'm your multi-video transcript analyst. First, select up to 3 videos to analyze, then ask me any questions about them.";
pub const DEFAULT_CLEARED_GREETING: &str =
    "Chat history cleared. What would you like to know about the selected videos?";
pub const DEFAULT_CREDENTIAL_FALLBACK: &str =
    "Gemini API key is not configured or invalid. Please check your configuration and restart.";
pub const DEFAULT_GENERIC_FALLBACK: &str =
    "Sorry, I encountered an error while analyzing the transcripts. Please try again.";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub transcripts: TranscriptStoreConfig,
    #[serde(default)]
    pub chat: ChatSettings,
}

/// Gemini API configuration
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptStoreConfig {
    /// JSON transcript store; the platform data directory is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Conversation texts and the credential markers.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    #[serde(default = "default_credential_markers")]
    pub credential_markers: Vec<String>,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_cleared_greeting")]
    pub cleared_greeting: String,
    #[serde(default = "default_credential_fallback")]
    pub credential_fallback: String,
    #[serde(default = "default_generic_fallback")]
    pub generic_fallback: String,
}

impl ChatSettings {
    pub fn classifier(&self) -> CredentialClassifier {
        CredentialClassifier::new(self.credential_markers.iter().cloned())
    }

    pub fn fallbacks(&self) -> FallbackMessages {
        FallbackMessages {
            credential: self.credential_fallback.clone(),
            generic: self.generic_fallback.clone(),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            credential_markers: default_credential_markers(),
            greeting: default_greeting(),
            cleared_greeting: default_cleared_greeting(),
            credential_fallback: default_credential_fallback(),
            generic_fallback: default_generic_fallback(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_credential_markers() -> Vec<String> {
    DEFAULT_CREDENTIAL_MARKERS
        .iter()
        .map(|marker| marker.to_string())
        .collect()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_cleared_greeting() -> String {
    DEFAULT_CLEARED_GREETING.to_string()
}

fn default_credential_fallback() -> String {
    DEFAULT_CREDENTIAL_FALLBACK.to_string()
}

fn default_generic_fallback() -> String {
    DEFAULT_GENERIC_FALLBACK.to_string()
}
