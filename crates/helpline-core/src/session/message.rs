//! Chat message types.
//!
//! This module contains types for representing messages in a support
//! conversation, including roles and the transient "thinking" placeholder.

use serde::{Deserialize, Serialize};

/// Content of the optimistic placeholder shown while a response is pending.
pub const PLACEHOLDER_TEXT: &str = "AI is thinking...";

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the customer.
    User,
    /// Message from the support assistant.
    Assistant,
}

/// A single message in a conversation log.
///
/// Messages are immutable once appended; the only structural mutation the
/// session performs on the log is filtered removal of placeholder entries
/// when a real response arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
    /// Whether this is a transient "response pending" entry.
    #[serde(default)]
    pub placeholder: bool,
    /// Whether this message asks the customer to confirm resolution.
    #[serde(default)]
    pub resolution_prompt: bool,
    /// Related follow-up suggestions attached to the message, in order.
    #[serde(default)]
    pub related: Vec<String>,
}

impl ChatMessage {
    /// Creates a customer message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            placeholder: false,
            resolution_prompt: false,
            related: Vec::new(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            placeholder: false,
            resolution_prompt: false,
            related: Vec::new(),
        }
    }

    /// Creates the transient "assistant is composing" placeholder.
    pub fn placeholder() -> Self {
        Self {
            role: MessageRole::Assistant,
            content: PLACEHOLDER_TEXT.to_string(),
            placeholder: true,
            resolution_prompt: false,
            related: Vec::new(),
        }
    }
}
