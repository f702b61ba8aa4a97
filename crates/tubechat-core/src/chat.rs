//! The chat session facade exposed to hosts.

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};

use crate::config::ChatSettings;
use crate::context::ContextCompositor;
use crate::conversation::{ChatMessage, ConversationEvent, ConversationLog};
use crate::selection::{SelectableTranscript, SelectionManager, SelectionState, ToggleOutcome};
use crate::stream::{
    MessageTarget, StreamController, StreamOutcome, StreamPhase, StreamTransport,
};
use crate::transcript::TranscriptSource;

const EVENT_CAPACITY: usize = 256;

/// Why a submission was refused before any network activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The question is empty after trimming.
    EmptyQuestion,
    /// No video is selected.
    NoSelection,
    /// None of the selected videos has a transcript in the source.
    MissingTranscripts,
    /// Another submission is still streaming.
    Busy,
}

/// Result of [`ChatSession::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Refused; the conversation log is unchanged.
    Rejected(Rejection),
    /// A user/assistant pair was appended and the stream reached a terminal state.
    Finished(StreamOutcome),
}

impl SubmitOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// One conversation over a bounded selection of video transcripts.
///
/// `ChatSession` ties together the selection, the conversation log and the
/// stream controller. It is cheap to clone; clones share state, so a host
/// can await [`submit`](Self::submit) on one task while another renders
/// [`messages`](Self::messages) or calls [`cancel`](Self::cancel).
#[derive(Clone)]
pub struct ChatSession {
    source: Arc<dyn TranscriptSource>,
    selection: Arc<RwLock<SelectionManager>>,
    log: Arc<RwLock<ConversationLog>>,
    controller: Arc<StreamController>,
    events: broadcast::Sender<ConversationEvent>,
    settings: Arc<ChatSettings>,
}

impl ChatSession {
    /// Creates a session with default texts and credential markers.
    pub fn new(source: Arc<dyn TranscriptSource>, transport: Arc<dyn StreamTransport>) -> Self {
        Self::with_settings(source, transport, ChatSettings::default())
    }

    pub fn with_settings(
        source: Arc<dyn TranscriptSource>,
        transport: Arc<dyn StreamTransport>,
        settings: ChatSettings,
    ) -> Self {
        let log = Arc::new(RwLock::new(ConversationLog::seeded(settings.greeting.clone())));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let controller = StreamController::new(transport, Arc::clone(&log), events.clone())
            .with_classifier(settings.classifier())
            .with_fallbacks(settings.fallbacks());

        Self {
            source,
            selection: Arc::new(RwLock::new(SelectionManager::new())),
            log,
            controller: Arc::new(controller),
            events,
            settings: Arc::new(settings),
        }
    }

    // ============================================================================
    // Selection
    // ============================================================================

    pub async fn selection(&self) -> SelectionState {
        self.selection.read().await.current()
    }

    pub async fn toggle_selection(&self, video_id: &str) -> ToggleOutcome {
        self.selection.write().await.toggle(video_id)
    }

    pub async fn reset_selection(&self) {
        self.selection.write().await.reset();
    }

    /// Re-reads the transcript source and returns the rows for display.
    ///
    /// The selection is preserved, including ids the source no longer has.
    pub async fn refresh(&self) -> Vec<SelectableTranscript> {
        let records = self.source.list();
        tracing::debug!(count = records.len(), "[ChatSession] Refreshed transcripts");
        self.selection.read().await.annotate(&records)
    }

    // ============================================================================
    // Conversation
    // ============================================================================

    /// Asks `question` about the selected transcripts.
    ///
    /// Refusals happen before anything is appended. Otherwise the user
    /// message and an empty streaming assistant message are appended
    /// together, the response is streamed into the latter, and this method
    /// returns once it is final. Stream failures are reported through the
    /// outcome and the message itself, never as errors.
    pub async fn submit(&self, question: &str) -> SubmitOutcome {
        let question = question.trim();
        if question.is_empty() {
            return SubmitOutcome::Rejected(Rejection::EmptyQuestion);
        }

        let Some(ticket) = self.controller.try_begin() else {
            return SubmitOutcome::Rejected(Rejection::Busy);
        };

        let selection = self.selection.read().await.current();
        if selection.is_empty() {
            return SubmitOutcome::Rejected(Rejection::NoSelection);
        }

        // Snapshot now so later repository changes cannot affect this stream.
        let snapshot = self.source.list();
        let context = ContextCompositor::build(&selection, &snapshot);
        if context.is_empty() {
            return SubmitOutcome::Rejected(Rejection::MissingTranscripts);
        }

        let (user_index, target) = {
            let mut log = self.log.write().await;
            let user_index = log.append(ChatMessage::user(question));
            let index = log.append(ChatMessage::pending_assistant());
            (
                user_index,
                MessageTarget {
                    index,
                    generation: log.generation(),
                },
            )
        };
        let _ = self.events.send(ConversationEvent::Appended { index: user_index });
        let _ = self.events.send(ConversationEvent::Appended {
            index: target.index,
        });

        tracing::info!(
            composite_id = %context.composite_id,
            question_len = question.len(),
            "[ChatSession] Submitting question"
        );

        // Run on its own task so the target is finalized even if the caller
        // stops awaiting this future.
        let controller = Arc::clone(&self.controller);
        let question = question.to_string();
        let handle =
            tokio::spawn(async move { controller.run(ticket, target, context, question).await });

        match handle.await {
            Ok(outcome) => SubmitOutcome::Finished(outcome),
            Err(err) => {
                tracing::error!(error = %err, "[ChatSession] Stream task failed");
                SubmitOutcome::Finished(self.controller.abandon(target).await)
            }
        }
    }

    /// Replaces the log with the cleared greeting.
    ///
    /// An in-flight stream is cancelled first; its target no longer exists
    /// afterwards and its final update is discarded.
    pub async fn clear(&self) {
        if self.controller.cancel() {
            tracing::debug!("[ChatSession] Cancelled in-flight stream before clearing");
        }
        self.log
            .write()
            .await
            .clear(ChatMessage::assistant(self.settings.cleared_greeting.clone()));
        let _ = self.events.send(ConversationEvent::Cleared);
    }

    /// Cancels the in-flight stream, if any.
    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    /// A copy of the conversation log.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.log.read().await.messages().to_vec()
    }

    pub async fn message(&self, index: usize) -> Option<ChatMessage> {
        self.log.read().await.get(index).cloned()
    }

    /// True while a credential problem has been seen and not yet followed by
    /// a clean completion.
    pub fn credential_alert(&self) -> bool {
        self.controller.credential_alert()
    }

    pub fn phase(&self) -> StreamPhase {
        self.controller.phase()
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Subscribes to log change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }
}
