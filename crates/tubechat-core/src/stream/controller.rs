use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{DEFAULT_CREDENTIAL_FALLBACK, DEFAULT_GENERIC_FALLBACK};
use crate::context::CombinedContext;
use crate::conversation::{ChatMessage, ConversationEvent, ConversationLog, MessageRole};

use super::classifier::CredentialClassifier;
use super::transport::{ChunkSink, StreamFault, StreamTransport};

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No submission outstanding.
    Idle,
    /// The transport has been started but has not delivered a chunk yet.
    Dispatching,
    /// At least one chunk has been applied to the target message.
    Streaming,
    /// End of stream reached; the target message is being finalized.
    Completed,
    /// The transport failed or was cancelled; the fallback is being written.
    Failed,
}

/// Why a stream ended in the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The fault description matched the credential classifier.
    Credential,
    /// Any other transport fault.
    Transient,
    /// The stream was cancelled from outside.
    Cancelled,
}

/// Terminal result of one streamed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { index: usize, errored: bool },
    Failed { index: usize, reason: FailureReason },
}

impl StreamOutcome {
    /// Index of the assistant message the stream wrote to.
    pub fn index(&self) -> usize {
        match self {
            Self::Completed { index, .. } | Self::Failed { index, .. } => *index,
        }
    }

    /// Whether the target message ended up marked as errored.
    pub fn errored(&self) -> bool {
        match self {
            Self::Completed { errored, .. } => *errored,
            Self::Failed { .. } => true,
        }
    }
}

/// Replacement texts written when a stream fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackMessages {
    pub credential: String,
    pub generic: String,
}

impl Default for FallbackMessages {
    fn default() -> Self {
        Self {
            credential: DEFAULT_CREDENTIAL_FALLBACK.to_string(),
            generic: DEFAULT_GENERIC_FALLBACK.to_string(),
        }
    }
}

/// Position of a stream's target message, tied to the log generation it was
/// appended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTarget {
    pub index: usize,
    pub generation: u64,
}

/// Proof that the caller holds the single in-flight slot.
///
/// Dropping the ticket without running it releases the slot.
#[derive(Debug)]
pub struct StreamTicket {
    permit: OwnedSemaphorePermit,
    cancel: CancellationToken,
}

/// Per-submission accumulation state. Lives only inside [`StreamController::run`].
struct StreamSession {
    id: Uuid,
    target: MessageTarget,
    accumulated: String,
    error_flag: bool,
}

impl StreamSession {
    fn new(target: MessageTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            accumulated: String::new(),
            error_flag: false,
        }
    }
}

/// Drives one streamed response at a time into the conversation log.
///
/// The controller is single-flight: [`try_begin`](Self::try_begin) hands out
/// at most one [`StreamTicket`] until the running stream reaches a terminal
/// state. Each chunk is applied to the target message under one write lock
/// of the log, so readers never observe a partially applied chunk.
pub struct StreamController {
    transport: Arc<dyn StreamTransport>,
    classifier: CredentialClassifier,
    fallbacks: FallbackMessages,
    log: Arc<RwLock<ConversationLog>>,
    events: broadcast::Sender<ConversationEvent>,
    flight: Arc<Semaphore>,
    phase: Mutex<StreamPhase>,
    cancel: Mutex<Option<CancellationToken>>,
    credential_alert: AtomicBool,
}

impl StreamController {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        log: Arc<RwLock<ConversationLog>>,
        events: broadcast::Sender<ConversationEvent>,
    ) -> Self {
        Self {
            transport,
            classifier: CredentialClassifier::default(),
            fallbacks: FallbackMessages::default(),
            log,
            events,
            flight: Arc::new(Semaphore::new(1)),
            phase: Mutex::new(StreamPhase::Idle),
            cancel: Mutex::new(None),
            credential_alert: AtomicBool::new(false),
        }
    }

    pub fn with_classifier(mut self, classifier: CredentialClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: FallbackMessages) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Claims the in-flight slot, or returns `None` if a stream is outstanding.
    ///
    /// The phase is `Dispatching` from here until the ticket's run ends.
    pub fn try_begin(&self) -> Option<StreamTicket> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        let permit = Arc::clone(&self.flight).try_acquire_owned().ok()?;
        *phase = StreamPhase::Dispatching;
        drop(phase);

        let cancel = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());
        Some(StreamTicket { permit, cancel })
    }

    /// True while a ticket is held.
    pub fn is_busy(&self) -> bool {
        self.flight.available_permits() == 0
    }

    /// Current phase; always `Idle` when no ticket is held, including after a
    /// ticket is dropped without being run.
    pub fn phase(&self) -> StreamPhase {
        let phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_busy() {
            *phase
        } else {
            StreamPhase::Idle
        }
    }

    /// Set by any credential hit; cleared only by a clean completion.
    pub fn credential_alert(&self) -> bool {
        self.credential_alert.load(Ordering::SeqCst)
    }

    /// Requests cancellation of the outstanding stream.
    ///
    /// Returns false when nothing is in flight.
    pub fn cancel(&self) -> bool {
        if !self.is_busy() {
            return false;
        }
        match self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Streams the response for `question` into the message at `target`.
    ///
    /// Always finalizes the target message: on success with the accumulated
    /// text, on fault or cancellation with a fallback text. Faults never
    /// escape this method.
    pub async fn run(
        &self,
        ticket: StreamTicket,
        target: MessageTarget,
        context: CombinedContext,
        question: String,
    ) -> StreamOutcome {
        let StreamTicket { permit, cancel } = ticket;
        let mut session = StreamSession::new(target);

        tracing::info!(
            session_id = %session.id,
            target_index = target.index,
            composite_id = %context.composite_id,
            sources = context.source_count,
            "[StreamController] Dispatching stream"
        );

        let (sink, mut chunks) = ChunkSink::channel();
        let result = {
            let mut stream = self.transport.start_stream(&context, &question, sink);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break Err(StreamFault::cancelled()),
                    Some(chunk) = chunks.recv() => self.absorb(&mut session, &chunk).await,
                    result = &mut stream => break result,
                }
            }
        };

        let outcome = match result {
            Ok(()) => {
                // Chunks pushed just before the transport resolved.
                while let Ok(chunk) = chunks.try_recv() {
                    self.absorb(&mut session, &chunk).await;
                }
                self.complete(&session).await
            }
            Err(fault) => self.fail(&session, fault).await,
        };

        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        // Release under the phase lock so readers never see Idle while busy.
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        *phase = StreamPhase::Idle;
        drop(permit);
        drop(phase);
        outcome
    }

    /// Finalizes `target` with the generic fallback when its stream task died
    /// without reaching a terminal state.
    pub async fn abandon(&self, target: MessageTarget) -> StreamOutcome {
        tracing::error!(
            target_index = target.index,
            "[StreamController] Stream task aborted; finalizing target"
        );
        let message = self.terminal_message(self.fallbacks.generic.clone(), true);
        self.write_target(target, message).await;
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.set_phase(StreamPhase::Idle);
        StreamOutcome::Failed {
            index: target.index,
            reason: FailureReason::Transient,
        }
    }

    async fn absorb(&self, session: &mut StreamSession, chunk: &str) {
        if self.classifier.is_credential_error(chunk) {
            if !session.error_flag {
                tracing::debug!(
                    session_id = %session.id,
                    "[StreamController] Credential error marker in chunk"
                );
            }
            session.error_flag = true;
            self.credential_alert.store(true, Ordering::SeqCst);
        }

        session.accumulated.push_str(chunk);
        self.enter_streaming();
        tracing::trace!(
            session_id = %session.id,
            chunk_len = chunk.len(),
            total_len = session.accumulated.len(),
            "[StreamController] Chunk applied"
        );

        let message = ChatMessage {
            role: MessageRole::Assistant,
            content: session.accumulated.clone(),
            streaming: true,
            errored: session.error_flag,
        };
        self.write_target(session.target, message).await;
    }

    async fn complete(&self, session: &StreamSession) -> StreamOutcome {
        self.set_phase(StreamPhase::Completed);
        let errored = session.error_flag;
        if !errored {
            self.credential_alert.store(false, Ordering::SeqCst);
        }

        let message = self.terminal_message(session.accumulated.clone(), errored);
        self.write_target(session.target, message).await;

        tracing::info!(
            session_id = %session.id,
            target_index = session.target.index,
            response_len = session.accumulated.len(),
            errored,
            "[StreamController] Stream completed"
        );
        StreamOutcome::Completed {
            index: session.target.index,
            errored,
        }
    }

    async fn fail(&self, session: &StreamSession, fault: StreamFault) -> StreamOutcome {
        self.set_phase(StreamPhase::Failed);
        let reason = if fault.is_cancelled() {
            FailureReason::Cancelled
        } else if self.classifier.is_credential_error(fault.description()) {
            FailureReason::Credential
        } else {
            FailureReason::Transient
        };

        let content = match reason {
            FailureReason::Credential => {
                self.credential_alert.store(true, Ordering::SeqCst);
                self.fallbacks.credential.clone()
            }
            FailureReason::Transient | FailureReason::Cancelled => self.fallbacks.generic.clone(),
        };

        if reason == FailureReason::Cancelled {
            tracing::info!(session_id = %session.id, "[StreamController] Stream cancelled");
        } else {
            tracing::warn!(
                session_id = %session.id,
                kind = ?fault.kind(),
                error = %fault,
                "[StreamController] Stream failed"
            );
        }

        let message = self.terminal_message(content, true);
        self.write_target(session.target, message).await;

        StreamOutcome::Failed {
            index: session.target.index,
            reason,
        }
    }

    fn terminal_message(&self, content: String, errored: bool) -> ChatMessage {
        ChatMessage {
            role: MessageRole::Assistant,
            content,
            streaming: false,
            errored,
        }
    }

    async fn write_target(&self, target: MessageTarget, message: ChatMessage) {
        let mut log = self.log.write().await;
        if log.generation() != target.generation {
            tracing::debug!(
                target_index = target.index,
                "[StreamController] Log was cleared; dropping update"
            );
            return;
        }

        match log.replace_at(target.index, message) {
            Ok(()) => {
                drop(log);
                // No subscribers is fine.
                let _ = self.events.send(ConversationEvent::Updated {
                    index: target.index,
                });
            }
            Err(err) => {
                tracing::warn!(
                    target_index = target.index,
                    error = %err,
                    "[StreamController] Could not update target message"
                );
            }
        }
    }

    fn set_phase(&self, phase: StreamPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn enter_streaming(&self) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase == StreamPhase::Dispatching {
            *phase = StreamPhase::Streaming;
        }
    }
}
