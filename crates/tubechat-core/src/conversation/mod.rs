//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `message`: Chat message types (`MessageRole`, `ChatMessage`)
//! - `log`: Ordered, tail-mutable message log (`ConversationLog`)
//! - `event`: Change notifications for hosts rendering the log (`ConversationEvent`)

mod event;
mod log;
mod message;

// Re-export public API
pub use event::ConversationEvent;
pub use log::ConversationLog;
pub use message::{ChatMessage, MessageRole};
