//! Transcript records and the read-only source they come from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A captured transcript for a single video.
///
/// Records are owned by the [`TranscriptSource`]; the chat engine never
/// mutates them and re-reads the source whenever it needs a fresh view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    /// Unique key of the video the transcript belongs to.
    pub video_id: String,
    /// Full transcript text.
    pub transcript: String,
    /// When the transcript was captured.
    pub fetched_at: DateTime<Utc>,
    /// Display title from video metadata, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TranscriptRecord {
    pub fn new(
        video_id: impl Into<String>,
        transcript: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            transcript: transcript.into(),
            fetched_at,
            title: None,
        }
    }

    /// Attaches a display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Returns the display title, falling back to `Video {video_id}`.
    pub fn display_title(&self) -> String {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title.to_string(),
            _ => format!("Video {}", self.video_id),
        }
    }
}

/// Read-only accessor over an externally maintained transcript collection.
///
/// `list` must be side-effect free and return records in the source's own
/// order. An unreadable or missing backing store is reported as an empty
/// list; implementations log the underlying problem themselves.
pub trait TranscriptSource: Send + Sync {
    fn list(&self) -> Vec<TranscriptRecord>;
}
