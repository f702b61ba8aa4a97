use serde::{Deserialize, Serialize};

/// Change notifications published while the conversation log is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// A message was appended at `index`.
    Appended { index: usize },
    /// The message at `index` was rewritten in place.
    Updated { index: usize },
    /// The log was replaced by a single greeting.
    Cleared,
}
