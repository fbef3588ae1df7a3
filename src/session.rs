//! Session-scoped chat log.
//!
//! Owned by the presentation layer and passed by reference into the
//! pipeline per call. Append-only for the lifetime of the session; never
//! persisted.

use polars::prelude::DataFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Tagged reply content so the renderer can dispatch without inspecting
/// strings.
#[derive(Debug, Clone)]
pub enum MessageContent {
    Tabular(DataFrame),
    Text(String),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, question: &str) {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: MessageContent::Text(question.to_string()),
        });
    }

    pub fn push_assistant(&mut self, content: MessageContent) {
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            content,
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_appended_in_order() {
        let mut session = ChatSession::new();
        session.push_user("who listens weekly?");
        session.push_assistant(MessageContent::Text("many people".to_string()));
        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }
}
