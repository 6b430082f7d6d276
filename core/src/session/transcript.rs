//! Conversation history sent to the completion provider

use crate::llm::{ChatMessage, MessageRole};

/// Ordered chat history owned by the session loop
///
/// The system message is inserted on construction and stays first. Messages
/// can only be appended, so it can never be removed or replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    /// Number of messages, system message included
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true once constructed
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of completed or in-flight turns
    pub fn user_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count()
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }

    pub fn last(&self) -> &ChatMessage {
        // The system message guarantees at least one element
        &self.messages[self.messages.len() - 1]
    }
}
