//! # tubechat-core
//!
//! Domain logic for chatting with a language model about several video
//! transcripts at once: bounded source selection, deterministic context
//! merging, a single-flight streaming controller and the conversation log it
//! writes into.
//!
//! Nothing here performs network or filesystem I/O. Transcripts come in
//! through [`TranscriptSource`] and model output through
//! [`StreamTransport`]; adapters live in the infrastructure and interaction
//! crates.

pub mod chat;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod selection;
pub mod stream;
pub mod transcript;

// Re-export common types
pub use chat::{ChatSession, Rejection, SubmitOutcome};
pub use context::{CombinedContext, ContextCompositor};
pub use error::{ChatError, Result};
pub use selection::{MAX_SELECTION, SelectionManager, SelectionState, ToggleOutcome};
pub use stream::{ChunkSink, StreamFault, StreamOutcome, StreamTransport};
pub use transcript::{TranscriptRecord, TranscriptSource};
