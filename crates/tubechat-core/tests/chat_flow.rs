use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use tubechat_core::config::{
    DEFAULT_CLEARED_GREETING, DEFAULT_CREDENTIAL_FALLBACK, DEFAULT_GENERIC_FALLBACK,
    DEFAULT_GREETING,
};
use tubechat_core::conversation::{ConversationEvent, MessageRole};
use tubechat_core::stream::{FailureReason, StreamPhase};
use tubechat_core::{
    ChatSession, ChunkSink, CombinedContext, Rejection, StreamFault, StreamOutcome,
    StreamTransport, SubmitOutcome, ToggleOutcome, TranscriptRecord, TranscriptSource,
};

// Mock transcript source whose contents can change between calls
struct MockSource {
    records: Mutex<Vec<TranscriptRecord>>,
}

impl MockSource {
    fn with_ids(ids: &[&str]) -> Self {
        let now = Utc::now();
        Self {
            records: Mutex::new(
                ids.iter()
                    .map(|id| TranscriptRecord::new(*id, format!("transcript of {id}"), now))
                    .collect(),
            ),
        }
    }

    fn remove(&self, video_id: &str) {
        self.records
            .lock()
            .unwrap()
            .retain(|record| record.video_id != video_id);
    }
}

impl TranscriptSource for MockSource {
    fn list(&self) -> Vec<TranscriptRecord> {
        self.records.lock().unwrap().clone()
    }
}

// Mock transport that replays a script and records what it was asked
struct MockTransport {
    chunks: Vec<&'static str>,
    result: Result<(), StreamFault>,
    seen: Mutex<Vec<(CombinedContext, String)>>,
}

impl MockTransport {
    fn replying(chunks: Vec<&'static str>) -> Self {
        Self {
            chunks,
            result: Ok(()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing(chunks: Vec<&'static str>, fault: StreamFault) -> Self {
        Self {
            chunks,
            result: Err(fault),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn start_stream(
        &self,
        context: &CombinedContext,
        question: &str,
        sink: ChunkSink,
    ) -> Result<(), StreamFault> {
        self.seen
            .lock()
            .unwrap()
            .push((context.clone(), question.to_string()));
        for chunk in &self.chunks {
            sink.push(*chunk);
            tokio::task::yield_now().await;
        }
        self.result.clone()
    }
}

// Mock transport that blocks after its first chunk until released
struct HeldTransport {
    release: Arc<Notify>,
}

#[async_trait]
impl StreamTransport for HeldTransport {
    async fn start_stream(
        &self,
        _context: &CombinedContext,
        _question: &str,
        sink: ChunkSink,
    ) -> Result<(), StreamFault> {
        sink.push("thinking");
        self.release.notified().await;
        sink.push(" done");
        Ok(())
    }
}

async fn wait_for_streaming(session: &ChatSession) {
    while session.phase() != StreamPhase::Streaming {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_session_starts_with_greeting() {
    let session = ChatSession::new(
        Arc::new(MockSource::with_ids(&["a"])),
        Arc::new(MockTransport::replying(vec![])),
    );

    let messages = session.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert_eq!(messages[0].content, DEFAULT_GREETING);
    assert!(!session.credential_alert());
}

#[tokio::test]
async fn test_submit_streams_answer_into_new_pair() {
    let transport = Arc::new(MockTransport::replying(vec!["Hello ", "world"]));
    let session = ChatSession::new(
        Arc::new(MockSource::with_ids(&["a", "b"])),
        transport.clone(),
    );
    session.toggle_selection("b").await;
    session.toggle_selection("a").await;

    let outcome = session.submit("  What is discussed?  ").await;
    assert_eq!(
        outcome,
        SubmitOutcome::Finished(StreamOutcome::Completed {
            index: 2,
            errored: false
        })
    );

    let messages = session.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, MessageRole::User);
    assert_eq!(messages[1].content, "What is discussed?");
    assert_eq!(messages[2].content, "Hello world");
    assert!(!messages[2].streaming);
    assert!(!messages[2].errored);

    let seen = transport.seen.lock().unwrap();
    let (context, question) = &seen[0];
    assert_eq!(question, "What is discussed?");
    assert_eq!(context.composite_id, "b,a");
    assert!(context.merged_text.starts_with("VIDEO 1 (ID: b):"));
}

#[tokio::test]
async fn test_rejections_leave_log_untouched() {
    let session = ChatSession::new(
        Arc::new(MockSource::with_ids(&["a"])),
        Arc::new(MockTransport::replying(vec!["unused"])),
    );

    assert_eq!(
        session.submit("question").await,
        SubmitOutcome::Rejected(Rejection::NoSelection)
    );

    session.toggle_selection("a").await;
    assert_eq!(
        session.submit("   ").await,
        SubmitOutcome::Rejected(Rejection::EmptyQuestion)
    );

    session.reset_selection().await;
    session.toggle_selection("missing").await;
    assert_eq!(
        session.submit("question").await,
        SubmitOutcome::Rejected(Rejection::MissingTranscripts)
    );

    assert_eq!(session.messages().await.len(), 1);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_submit_while_streaming_is_rejected() {
    let release = Arc::new(Notify::new());
    let session = ChatSession::new(
        Arc::new(MockSource::with_ids(&["a"])),
        Arc::new(HeldTransport {
            release: Arc::clone(&release),
        }),
    );
    session.toggle_selection("a").await;

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("first").await })
    };
    wait_for_streaming(&session).await;

    assert_eq!(
        session.submit("second").await,
        SubmitOutcome::Rejected(Rejection::Busy)
    );
    let messages = session.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].content, "thinking");
    assert!(messages[2].streaming);

    release.notify_one();
    let outcome = first.await.unwrap();
    assert!(!outcome.is_rejected());

    let messages = session.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].content, "thinking done");
    assert!(!messages[2].streaming);
}

#[tokio::test]
async fn test_credential_chunk_sets_alert() {
    let source = Arc::new(MockSource::with_ids(&["a"]));
    let session = ChatSession::new(
        source.clone(),
        Arc::new(MockTransport::replying(vec![
            "API key not valid. ",
            "Please pass a valid API key.",
        ])),
    );
    session.toggle_selection("a").await;

    let outcome = session.submit("hi").await;
    assert_eq!(
        outcome,
        SubmitOutcome::Finished(StreamOutcome::Completed {
            index: 2,
            errored: true
        })
    );
    assert!(session.message(2).await.unwrap().errored);
    assert!(session.credential_alert());

    // A transient failure on its own never raises the alert.
    let failing = ChatSession::new(
        source,
        Arc::new(MockTransport::failing(vec![], StreamFault::network("reset"))),
    );
    failing.toggle_selection("a").await;
    failing.submit("hi").await;
    assert!(!failing.credential_alert());
}

#[tokio::test]
async fn test_fault_after_zero_chunks_uses_fallbacks() {
    let source = Arc::new(MockSource::with_ids(&["a"]));

    let generic = ChatSession::new(
        source.clone(),
        Arc::new(MockTransport::failing(
            vec![],
            StreamFault::http(503, "UNAVAILABLE: overloaded"),
        )),
    );
    generic.toggle_selection("a").await;
    assert_eq!(
        generic.submit("q").await,
        SubmitOutcome::Finished(StreamOutcome::Failed {
            index: 2,
            reason: FailureReason::Transient
        })
    );
    let message = generic.message(2).await.unwrap();
    assert_eq!(message.content, DEFAULT_GENERIC_FALLBACK);
    assert!(message.errored && !message.streaming);

    let credential = ChatSession::new(
        source,
        Arc::new(MockTransport::failing(
            vec![],
            StreamFault::http(400, "INVALID_ARGUMENT: API key not valid"),
        )),
    );
    credential.toggle_selection("a").await;
    credential.submit("q").await;
    let message = credential.message(2).await.unwrap();
    assert_eq!(message.content, DEFAULT_CREDENTIAL_FALLBACK);
    assert!(message.errored && !message.streaming);
    assert!(credential.credential_alert());
}

#[tokio::test]
async fn test_cancel_finalizes_message() {
    let session = ChatSession::new(
        Arc::new(MockSource::with_ids(&["a"])),
        Arc::new(HeldTransport {
            release: Arc::new(Notify::new()),
        }),
    );
    session.toggle_selection("a").await;
    assert!(!session.cancel());

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("q").await })
    };
    wait_for_streaming(&session).await;
    assert!(session.cancel());

    assert_eq!(
        pending.await.unwrap(),
        SubmitOutcome::Finished(StreamOutcome::Failed {
            index: 2,
            reason: FailureReason::Cancelled
        })
    );
    let message = session.message(2).await.unwrap();
    assert_eq!(message.content, DEFAULT_GENERIC_FALLBACK);
    assert!(!message.streaming);
    assert_eq!(session.phase(), StreamPhase::Idle);
}

#[tokio::test]
async fn test_clear_always_leaves_single_greeting() {
    let session = ChatSession::new(
        Arc::new(MockSource::with_ids(&["a"])),
        Arc::new(MockTransport::replying(vec!["answer"])),
    );
    session.toggle_selection("a").await;
    for _ in 0..3 {
        session.submit("q").await;
    }
    assert_eq!(session.messages().await.len(), 7);

    session.clear().await;
    let messages = session.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, DEFAULT_CLEARED_GREETING);

    session.clear().await;
    assert_eq!(session.messages().await.len(), 1);
}

#[tokio::test]
async fn test_clear_during_stream_discards_stale_target() {
    let release = Arc::new(Notify::new());
    let session = ChatSession::new(
        Arc::new(MockSource::with_ids(&["a"])),
        Arc::new(HeldTransport {
            release: Arc::clone(&release),
        }),
    );
    session.toggle_selection("a").await;

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("q").await })
    };
    wait_for_streaming(&session).await;

    session.clear().await;
    pending.await.unwrap();

    let messages = session.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, DEFAULT_CLEARED_GREETING);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_snapshot_taken_at_submission() {
    let source = Arc::new(MockSource::with_ids(&["a", "b"]));
    let transport = Arc::new(MockTransport::replying(vec!["ok"]));
    let session = ChatSession::new(source.clone(), transport.clone());
    session.toggle_selection("a").await;
    session.toggle_selection("b").await;

    source.remove("a");
    session.submit("q").await;

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen[0].0.source_count, 1);
    assert_eq!(seen[0].0.composite_id, "a,b");
    assert!(seen[0].0.merged_text.starts_with("VIDEO 1 (ID: b):"));
}

#[tokio::test]
async fn test_refresh_preserves_selection() {
    let source = Arc::new(MockSource::with_ids(&["a", "b", "c", "d"]));
    let session = ChatSession::new(source.clone(), Arc::new(MockTransport::replying(vec![])));
    for id in ["a", "b", "c"] {
        assert_eq!(session.toggle_selection(id).await, ToggleOutcome::Added);
    }
    assert_eq!(
        session.toggle_selection("d").await,
        ToggleOutcome::AtCapacity
    );

    source.remove("b");
    let rows = session.refresh().await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().find(|r| r.record.video_id == "d").is_some_and(|r| !r.selectable));
    assert_eq!(session.selection().await.selected_ids(), ["a", "b", "c"]);
}

#[tokio::test]
async fn test_events_follow_log_mutations() {
    let session = ChatSession::new(
        Arc::new(MockSource::with_ids(&["a"])),
        Arc::new(MockTransport::replying(vec!["x", "y"])),
    );
    let mut events = session.subscribe();
    session.toggle_selection("a").await;
    session.submit("q").await;
    session.clear().await;

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(
        received,
        vec![
            ConversationEvent::Appended { index: 1 },
            ConversationEvent::Appended { index: 2 },
            ConversationEvent::Updated { index: 2 },
            ConversationEvent::Updated { index: 2 },
            ConversationEvent::Updated { index: 2 },
            ConversationEvent::Cleared,
        ]
    );
}
