//! Conversation messages and chat history.

use crate::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        })
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(MessageRole::User, content)
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, content)
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::text(MessageRole::Tool, content)
        }
    }
}

// ── ChatHistory ────────────────────────────────────────────────────

/// Ordered conversation passed to selectors and extended with function
/// results.
///
/// Serializes as a plain JSON array of messages.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct ChatHistory {
    messages: Vec<Message>,
}

impl ChatHistory {
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.add(Message::system(content));
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.add(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.add(Message::assistant_text(content));
    }

    /// Record the tool calls an assistant turn requested.
    pub fn add_tool_calls(&mut self, calls: Vec<ToolCall>) {
        self.add(Message::assistant_tool_calls(calls));
    }

    /// Record a function result as a tool message.
    pub fn add_function_result(&mut self, call_id: impl Into<String>, content: impl Into<String>) {
        self.add(Message::tool_result(call_id, content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// All tool calls requested so far, oldest first.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.messages
            .iter()
            .filter_map(|m| m.tool_calls.as_deref())
            .flatten()
    }

    /// Number of calls per model-visible function name.
    pub fn function_call_counts(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for call in self.tool_calls() {
            *counts.entry(call.function.name.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl From<Vec<Message>> for ChatHistory {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
