//! Streaming response handling.
//!
//! - `transport`: the push-based seam to the model backend (`StreamTransport`, `ChunkSink`, `StreamFault`)
//! - `classifier`: the credential-error predicate applied to chunks and faults
//! - `controller`: the single-flight state machine that streams into the conversation log

mod classifier;
mod controller;
mod transport;

pub use classifier::{CredentialClassifier, DEFAULT_CREDENTIAL_MARKERS};
pub use controller::{
    FailureReason, FallbackMessages, MessageTarget, StreamController, StreamOutcome, StreamPhase,
    StreamTicket,
};
pub use transport::{ChunkSink, FaultKind, StreamFault, StreamTransport};
