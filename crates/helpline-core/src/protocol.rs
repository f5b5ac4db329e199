//! Wire protocol for the realtime support channel.
//!
//! Event names and payload shapes are a de facto contract with the backend;
//! they are represented here as tagged serde enums so the shape is checked
//! at compile time instead of living in bare string/object pairs.
//!
//! Inbound payloads are parsed defensively: the conversation must never
//! break because of a malformed server payload.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::session::{ChatMessage, ChatSession};

/// Literal marker the backend embeds in a message that asks the customer to
/// confirm resolution.
///
/// Kept as a compatibility shim: senders that provide the structured
/// `resolution_prompt` flag are preferred over this substring match.
pub const RESOLUTION_PROMPT_MARKER: &str = "✅ Does this answer resolve your issue?";

/// Canned acknowledgement sent when the customer confirms resolution.
pub const RESOLUTION_CONFIRMED_TEXT: &str = "Yes, that resolves my issue. Thank you!";

/// Canned acknowledgement sent when the customer still needs help.
pub const RESOLUTION_DECLINED_TEXT: &str = "No, I still need help with this.";

/// Events sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// One customer chat message, carrying the full intake snapshot.
    ChatMessage(OutboundChat),
}

impl ClientEvent {
    /// Encodes the event as a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Events delivered by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// An assistant response.
    BotMessage(InboundBot),
}

impl ServerEvent {
    /// Decodes a JSON text frame.
    ///
    /// Unrecognized event names and malformed frames are dropped with a
    /// warning rather than propagated; a broken frame must not break the
    /// conversation.
    pub fn decode(frame: &str) -> Option<Self> {
        match serde_json::from_str(frame) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "Dropping undecodable server frame");
                None
            }
        }
    }
}

/// Payload of a `chat_message` event.
///
/// Every outbound chat event includes the full intake snapshot alongside
/// the content and the session identity, tolerating a stateless or
/// partially-stateful backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundChat {
    pub session_id: String,
    pub content: String,
    pub user_email: String,
    pub customer_name: String,
    pub subject: String,
    pub category: String,
    /// Present only when the message came from clicking a related
    /// suggestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_related_question: Option<bool>,
}

impl OutboundChat {
    /// Builds the payload for one message from the current session state.
    pub fn from_session(session: &ChatSession, content: impl Into<String>, related: bool) -> Self {
        Self {
            session_id: session.id.clone(),
            content: content.into(),
            user_email: session.intake.email.clone(),
            customer_name: session.intake.name.clone(),
            subject: session.intake.subject.clone(),
            category: session.intake.category.to_string(),
            is_related_question: related.then_some(true),
        }
    }
}

/// Payload of a `bot_message` event, parsed defensively.
///
/// Fields of the wrong shape degrade to safe defaults instead of failing
/// the frame; unknown fields (e.g. `session_id`, `role` echoes) are
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundBot {
    /// Response text; non-string or absent content degrades to empty.
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    /// Related follow-up suggestions; anything that is not a sequence
    /// degrades to empty, non-string items are skipped.
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub related: Vec<String>,
    /// Structured resolution-prompt flag. Optional; older backends signal
    /// through the marker text instead.
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub resolution_prompt: Option<bool>,
}

impl InboundBot {
    /// Whether this message should surface the resolution confirm/deny
    /// buttons.
    ///
    /// The structured flag wins when the sender provides it; otherwise we
    /// fall back to detecting the literal marker in the content.
    pub fn wants_resolution_prompt(&self) -> bool {
        self.resolution_prompt
            .unwrap_or_else(|| self.content.contains(RESOLUTION_PROMPT_MARKER))
    }

    /// Converts the payload into a log entry.
    pub fn into_message(self) -> ChatMessage {
        let resolution_prompt = self.wants_resolution_prompt();
        let mut message = ChatMessage::assistant(self.content);
        message.resolution_prompt = resolution_prompt;
        message.related = self.related;
        message
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

fn lenient_string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect()),
        _ => Ok(Vec::new()),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool())
}
