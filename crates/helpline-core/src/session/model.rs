//! Session domain model.
//!
//! This module contains the core `ChatSession` entity: the in-memory model
//! of one support conversation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intake::IntakeRecord;
use super::message::ChatMessage;

/// The canonical state of one support conversation.
///
/// A session contains:
/// - The session identity correlating messages across reconnects
/// - The customer intake record
/// - The append-only message log (insertion order is display order)
/// - The pending input text (unsent draft in the compose box)
/// - The started flag
///
/// No component other than the controller mutates this directly; the
/// mutation primitives below are the complete set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Opaque identity, stable for the lifetime of the conversation.
    pub id: String,
    /// Customer intake record.
    pub intake: IntakeRecord,
    /// Conversation log, append-only apart from placeholder removal.
    pub messages: Vec<ChatMessage>,
    /// Unsent text in the compose box, persisted with the draft.
    pub pending_input: String,
    /// Whether the conversation has been started via intake submission.
    pub started: bool,
}

impl ChatSession {
    /// Creates a fresh session with a new random identity and empty log.
    pub fn new() -> Self {
        Self {
            id: new_session_id(),
            intake: IntakeRecord::default(),
            messages: Vec::new(),
            pending_input: String::new(),
            started: false,
        }
    }

    /// Appends a message to the log.
    pub fn append_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Removes every placeholder entry from the log.
    pub fn remove_placeholders(&mut self) {
        self.messages.retain(|m| !m.placeholder);
    }

    /// The placeholder-removal-then-append transaction performed when a
    /// real response arrives.
    pub fn resolve_placeholders(&mut self, response: ChatMessage) {
        self.remove_placeholders();
        self.messages.push(response);
    }

    /// Whether an outstanding placeholder exists.
    pub fn has_placeholder(&self) -> bool {
        self.messages.iter().any(|m| m.placeholder)
    }

    /// Replaces the pending input text.
    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    /// One-way transition to started, seeding the log with the greeting.
    pub fn begin(&mut self, greeting: ChatMessage) {
        self.started = true;
        self.messages = vec![greeting];
    }

    /// Resets to fresh defaults and allocates a NEW identity.
    ///
    /// The previous identity is never reused.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether tearing this session down would lose customer work.
    ///
    /// Started: true when the log is non-empty or the pending input is
    /// non-blank. Not started: true when any intake field is non-empty.
    pub fn has_unsaved_work(&self) -> bool {
        if self.started {
            !self.messages.is_empty() || !self.pending_input.trim().is_empty()
        } else {
            self.intake.is_dirty()
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocates a new opaque session identity.
///
/// Random and collision-tolerant; not cryptographically meaningful.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
