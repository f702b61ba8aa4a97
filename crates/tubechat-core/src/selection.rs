//! Bounded, ordered selection of source videos.
//!
//! The order in which ids are selected is significant: the
//! [`ContextCompositor`](crate::context::ContextCompositor) emits transcript
//! blocks in exactly this order.

use serde::Serialize;

use crate::transcript::TranscriptRecord;

/// Maximum number of videos that may be selected at once.
pub const MAX_SELECTION: usize = 3;

/// Snapshot of the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    selected_ids: Vec<String>,
    max: usize,
}

impl SelectionState {
    /// Selected ids in insertion order.
    pub fn selected_ids(&self) -> &[String] {
        &self.selected_ids
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.selected_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_ids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.selected_ids.len() >= self.max
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.selected_ids.iter().any(|id| id == video_id)
    }
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            selected_ids: Vec::new(),
            max: MAX_SELECTION,
        }
    }
}

/// Result of a [`SelectionManager::toggle`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The id was appended to the end of the selection.
    Added,
    /// The id was removed from the selection.
    Removed,
    /// The selection is at capacity; nothing changed.
    AtCapacity,
}

/// A transcript annotated for display in a selection list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectableTranscript {
    pub record: TranscriptRecord,
    pub title: String,
    pub selected: bool,
    /// False when the row is unselected and the selection is full.
    pub selectable: bool,
}

/// Owns the set of chosen video ids and enforces [`MAX_SELECTION`].
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    state: SelectionState,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `video_id` if absent and there is room, deselects it if present.
    ///
    /// Adding to a full selection is a silent no-op reported as
    /// [`ToggleOutcome::AtCapacity`].
    pub fn toggle(&mut self, video_id: &str) -> ToggleOutcome {
        if let Some(position) = self
            .state
            .selected_ids
            .iter()
            .position(|id| id == video_id)
        {
            self.state.selected_ids.remove(position);
            return ToggleOutcome::Removed;
        }

        if self.state.is_full() {
            return ToggleOutcome::AtCapacity;
        }

        self.state.selected_ids.push(video_id.to_string());
        ToggleOutcome::Added
    }

    /// Returns a snapshot of the current selection.
    pub fn current(&self) -> SelectionState {
        self.state.clone()
    }

    /// Clears the selection.
    pub fn reset(&mut self) {
        self.state.selected_ids.clear();
    }

    /// Derives per-record `selected`/`selectable` flags for a repository snapshot.
    ///
    /// Rows keep the snapshot's order. Selected ids missing from the snapshot
    /// stay selected but produce no row.
    pub fn annotate(&self, records: &[TranscriptRecord]) -> Vec<SelectableTranscript> {
        let full = self.state.is_full();
        records
            .iter()
            .map(|record| {
                let selected = self.state.contains(&record.video_id);
                SelectableTranscript {
                    title: record.display_title(),
                    record: record.clone(),
                    selected,
                    selectable: selected || !full,
                }
            })
            .collect()
    }
}
