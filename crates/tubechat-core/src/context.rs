//! Merging selected transcripts into one prompt context.

use serde::Serialize;

use crate::selection::SelectionState;
use crate::transcript::TranscriptRecord;

/// Line inserted between consecutive transcript blocks.
pub const VIDEO_SEPARATOR: &str = "\n\n===== NEXT VIDEO =====\n\n";

/// Delimiter used to build [`CombinedContext::composite_id`].
pub const COMPOSITE_ID_DELIMITER: &str = ",";

const TITLE_DELIMITER: &str = ", ";

/// The merged grounding input for one submission.
///
/// Derived, never stored: it is rebuilt from the selection and a fresh
/// repository snapshot on every submission, so a repository change after
/// submission cannot affect a stream already in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedContext {
    /// Selected ids joined in selection order.
    pub composite_id: String,
    /// Display titles of the merged records, comma separated.
    pub composite_title: String,
    /// Labeled transcript blocks separated by [`VIDEO_SEPARATOR`].
    pub merged_text: String,
    /// Number of transcript blocks in `merged_text`.
    pub source_count: usize,
}

impl CombinedContext {
    /// True when no selected transcript was found; such a context must not be sent.
    pub fn is_empty(&self) -> bool {
        self.source_count == 0
    }
}

/// Builds [`CombinedContext`] values.
pub struct ContextCompositor;

impl ContextCompositor {
    /// Merges the selected records of `snapshot`, ordered by the selection.
    ///
    /// Repository order is ignored. Selected ids absent from the snapshot are
    /// skipped, and block numbering counts only the records that were found.
    pub fn build(selection: &SelectionState, snapshot: &[TranscriptRecord]) -> CombinedContext {
        let records: Vec<&TranscriptRecord> = selection
            .selected_ids()
            .iter()
            .filter_map(|id| snapshot.iter().find(|record| &record.video_id == id))
            .collect();

        let merged_text = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                format!(
                    "VIDEO {} (ID: {}):\n{}",
                    i + 1,
                    record.video_id,
                    record.transcript
                )
            })
            .collect::<Vec<_>>()
            .join(VIDEO_SEPARATOR);

        let composite_title = records
            .iter()
            .map(|record| record.display_title())
            .collect::<Vec<_>>()
            .join(TITLE_DELIMITER);

        CombinedContext {
            composite_id: selection.selected_ids().join(COMPOSITE_ID_DELIMITER),
            composite_title,
            merged_text,
            source_count: records.len(),
        }
    }
}
