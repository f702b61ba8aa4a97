//! Transcript stores backing [`TranscriptSource`].

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tubechat_core::error::Result;
use tubechat_core::transcript::{TranscriptRecord, TranscriptSource};

/// Transcript store kept in a single JSON array file.
///
/// The file is written by whatever captures transcripts; the chat engine
/// only reads it. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct JsonTranscriptStore {
    path: PathBuf,
}

impl JsonTranscriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all records in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Vec<TranscriptRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Overwrites the store with `records`, creating parent directories.
    pub fn save_all(&self, records: &[TranscriptRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Inserts `record`, replacing any record with the same video id in place.
    pub fn upsert(&self, record: TranscriptRecord) -> Result<()> {
        let mut records = self.load()?;
        match records
            .iter_mut()
            .find(|existing| existing.video_id == record.video_id)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        self.save_all(&records)
    }
}

impl TranscriptSource for JsonTranscriptStore {
    fn list(&self) -> Vec<TranscriptRecord> {
        match self.load() {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    "[TranscriptStore] Failed to read {}: {}",
                    self.path.display(),
                    err
                );
                Vec::new()
            }
        }
    }
}

/// In-memory transcript store.
#[derive(Debug, Default)]
pub struct InMemoryTranscriptStore {
    records: RwLock<Vec<TranscriptRecord>>,
}

impl InMemoryTranscriptStore {
    pub fn new(records: Vec<TranscriptRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Inserts `record`, replacing any record with the same video id in place.
    pub fn upsert(&self, record: TranscriptRecord) {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match records
            .iter_mut()
            .find(|existing| existing.video_id == record.video_id)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Removes the record for `video_id`. Returns whether one existed.
    pub fn remove(&self, video_id: &str) -> bool {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = records.len();
        records.retain(|record| record.video_id != video_id);
        records.len() != before
    }
}

impl TranscriptSource for InMemoryTranscriptStore {
    fn list(&self) -> Vec<TranscriptRecord> {
        self.records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_in_memory_upsert_replaces_in_place() {
        let now = Utc::now();
        let store = InMemoryTranscriptStore::new(vec![
            TranscriptRecord::new("a", "old", now),
            TranscriptRecord::new("b", "beta", now),
        ]);

        store.upsert(TranscriptRecord::new("a", "new", now));
        store.upsert(TranscriptRecord::new("c", "gamma", now));

        let ids: Vec<String> = store.list().into_iter().map(|r| r.video_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.list()[0].transcript, "new");
    }

    #[test]
    fn test_in_memory_remove() {
        let store = InMemoryTranscriptStore::new(vec![TranscriptRecord::new(
            "a",
            "alpha",
            Utc::now(),
        )]);
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert!(store.list().is_empty());
    }
}
