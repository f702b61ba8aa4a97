use crate::error::{ChatError, Result};

use super::message::ChatMessage;

/// Ordered conversation history.
///
/// Append-only, except that a message still marked `streaming` may be
/// replaced in place. Indices never shift within a generation; `clear`
/// starts a new generation so a stale stream can detect that its target
/// no longer exists.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
    generation: u64,
}

impl ConversationLog {
    /// Creates a log holding a single assistant greeting.
    pub fn seeded(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(greeting)],
            generation: 0,
        }
    }

    /// Appends a message and returns its index.
    pub fn append(&mut self, message: ChatMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Replaces the message at `index`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `index` is out of bounds
    /// - `FinalizedMessage` if the current message is no longer streaming
    pub fn replace_at(&mut self, index: usize, message: ChatMessage) -> Result<()> {
        let slot = self
            .messages
            .get_mut(index)
            .ok_or_else(|| ChatError::not_found("message", index.to_string()))?;

        if slot.is_final() {
            return Err(ChatError::FinalizedMessage { index });
        }

        *slot = message;
        Ok(())
    }

    /// Replaces the whole log with `seed` and starts a new generation.
    pub fn clear(&mut self, seed: ChatMessage) {
        self.messages.clear();
        self.messages.push(seed);
        self.generation += 1;
    }

    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Incremented by every `clear`.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::MessageRole;

    #[test]
    fn test_append_returns_stable_indices() {
        let mut log = ConversationLog::seeded("hi");
        assert_eq!(log.append(ChatMessage::user("q1")), 1);
        assert_eq!(log.append(ChatMessage::pending_assistant()), 2);
        assert_eq!(log.append(ChatMessage::user("q2")), 3);
        assert_eq!(log.get(1).unwrap().content, "q1");
    }

    #[test]
    fn test_replace_streaming_message() {
        let mut log = ConversationLog::seeded("hi");
        let index = log.append(ChatMessage::pending_assistant());

        let mut partial = ChatMessage::pending_assistant();
        partial.content = "Hel".to_string();
        log.replace_at(index, partial).unwrap();
        log.replace_at(index, ChatMessage::assistant("Hello")).unwrap();

        let message = log.get(index).unwrap();
        assert_eq!(message.content, "Hello");
        assert!(message.is_final());
    }

    #[test]
    fn test_finalized_message_is_immutable() {
        let mut log = ConversationLog::seeded("hi");
        let err = log.replace_at(0, ChatMessage::assistant("rewritten")).unwrap_err();
        assert!(err.is_finalized_message());
        assert_eq!(log.get(0).unwrap().content, "hi");
    }

    #[test]
    fn test_replace_out_of_bounds() {
        let mut log = ConversationLog::seeded("hi");
        let err = log.replace_at(7, ChatMessage::assistant("x")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_clear_reseeds_and_bumps_generation() {
        let mut log = ConversationLog::seeded("hi");
        for i in 0..5 {
            log.append(ChatMessage::user(format!("q{i}")));
        }
        log.clear(ChatMessage::assistant("cleared"));

        assert_eq!(log.len(), 1);
        assert_eq!(log.generation(), 1);
        let seed = log.last().unwrap();
        assert_eq!(seed.role, MessageRole::Assistant);
        assert_eq!(seed.content, "cleared");
    }
}
