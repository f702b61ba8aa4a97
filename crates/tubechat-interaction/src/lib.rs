//! Model transports for tubechat.
//!
//! Implements [`tubechat_core::StreamTransport`] over the Gemini REST API.

pub mod gemini_transport;
pub mod prompt;
pub mod sse;

pub use gemini_transport::{GeminiTransport, MISSING_API_KEY_MESSAGE};
pub use prompt::build_prompt;
pub use sse::SseDecoder;
