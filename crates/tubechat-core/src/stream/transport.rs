use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::context::CombinedContext;

/// Push side of a streaming response.
///
/// Transports call [`push`](ChunkSink::push) once per fragment, in arrival
/// order. Fragments may be any size; the receiving controller makes no
/// assumption about byte, token or line granularity.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChunkSink {
    /// Creates a connected sink and the receiver that drains it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Delivers a chunk. Returns false once the receiving session is gone,
    /// which a transport should treat as a request to stop.
    pub fn push(&self, chunk: impl Into<String>) -> bool {
        self.tx.send(chunk.into()).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Category of a [`StreamFault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The backend answered with a non-success status.
    Http { status: u16 },
    /// The connection failed or dropped.
    Network,
    /// The response body could not be decoded.
    Decode,
    /// The stream was aborted from outside.
    Cancelled,
    Other,
}

/// Terminal failure reported by a [`StreamTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description}")]
pub struct StreamFault {
    kind: FaultKind,
    description: String,
}

impl StreamFault {
    pub fn new(kind: FaultKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn http(status: u16, description: impl Into<String>) -> Self {
        Self::new(FaultKind::Http { status }, description)
    }

    pub fn network(description: impl Into<String>) -> Self {
        Self::new(FaultKind::Network, description)
    }

    pub fn decode(description: impl Into<String>) -> Self {
        Self::new(FaultKind::Decode, description)
    }

    pub fn cancelled() -> Self {
        Self::new(FaultKind::Cancelled, "stream cancelled")
    }

    pub fn other(description: impl Into<String>) -> Self {
        Self::new(FaultKind::Other, description)
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// Human-readable fault text; this is what the credential classifier inspects.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FaultKind::Cancelled
    }
}

/// Opens a streamed model response for a context and question.
///
/// The future resolves `Ok(())` once the backend signals end of stream and
/// `Err` on failure. Every chunk must be pushed to `sink` before the future
/// resolves. Dropping the future aborts the request.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn start_stream(
        &self,
        context: &CombinedContext,
        question: &str,
        sink: ChunkSink,
    ) -> Result<(), StreamFault>;
}
