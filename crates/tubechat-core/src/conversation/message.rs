//! Conversation message types.

use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

/// A single entry in the conversation log.
///
/// An assistant message with `streaming == true` is the in-flight target of
/// a stream and may still be rewritten. Once `streaming` is false the
/// message is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
    /// True while a response is still being streamed into this message.
    #[serde(default)]
    pub streaming: bool,
    /// True when the response failed or carried a credential error.
    #[serde(default)]
    pub errored: bool,
}

impl ChatMessage {
    /// A final user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            streaming: false,
            errored: false,
        }
    }

    /// A final assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            streaming: false,
            errored: false,
        }
    }

    /// An empty assistant message awaiting streamed content.
    pub fn pending_assistant() -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            streaming: true,
            errored: false,
        }
    }

    pub fn is_final(&self) -> bool {
        !self.streaming
    }

    /// True for a streaming message that has not received any text yet.
    pub fn is_pending(&self) -> bool {
        self.streaming && self.content.is_empty()
    }
}
