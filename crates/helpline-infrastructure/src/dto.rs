//! Draft slot DTOs.
//!
//! The serialized draft keeps the field names of the browser client's
//! storage slot (`sessionId`, `messages`, `input`, `prefill`, `started`) so
//! a slot written by either client recovers in the other.
//!
//! Recovery is per-field: a field that is absent or of the wrong shape
//! falls back to its default individually instead of rejecting the whole
//! draft.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use helpline_core::session::{
    ChatMessage, ChatSession, IntakeRecord, MessageRole, SupportCategory, new_session_id,
};

/// Serialized form of the draft slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DraftDto {
    #[serde(deserialize_with = "lenient_string")]
    pub session_id: String,
    #[serde(deserialize_with = "lenient_messages")]
    pub messages: Vec<DraftMessageDto>,
    #[serde(deserialize_with = "lenient_string")]
    pub input: String,
    #[serde(deserialize_with = "lenient_prefill")]
    pub prefill: PrefillDto,
    #[serde(deserialize_with = "lenient_bool")]
    pub started: bool,
}

/// Serialized form of one log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DraftMessageDto {
    pub role: String,
    pub content: String,
    pub is_thinking: bool,
    pub show_resolution_buttons: bool,
    pub related: Vec<String>,
}

/// Serialized form of the intake record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefillDto {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub category: String,
}

impl DraftDto {
    /// Snapshots the in-memory session for persistence.
    pub fn from_session(session: &ChatSession) -> Self {
        Self {
            session_id: session.id.clone(),
            messages: session.messages.iter().map(DraftMessageDto::from_message).collect(),
            input: session.pending_input.clone(),
            prefill: PrefillDto {
                name: session.intake.name.clone(),
                email: session.intake.email.clone(),
                subject: session.intake.subject.clone(),
                category: session.intake.category.to_string(),
            },
            started: session.started,
        }
    }

    /// Rebuilds the domain session from a recovered draft.
    ///
    /// A blank recovered identity is replaced with a fresh one; an unknown
    /// category spelling falls back to the default.
    pub fn into_session(self) -> ChatSession {
        let id = if self.session_id.is_empty() {
            new_session_id()
        } else {
            self.session_id
        };
        ChatSession {
            id,
            intake: IntakeRecord {
                name: self.prefill.name,
                email: self.prefill.email,
                subject: self.prefill.subject,
                category: SupportCategory::from_str(&self.prefill.category).unwrap_or_default(),
            },
            messages: self.messages.into_iter().map(DraftMessageDto::into_message).collect(),
            pending_input: self.input,
            started: self.started,
        }
    }
}

impl DraftMessageDto {
    fn from_message(message: &ChatMessage) -> Self {
        Self {
            role: match message.role {
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: message.content.clone(),
            is_thinking: message.placeholder,
            show_resolution_buttons: message.resolution_prompt,
            related: message.related.clone(),
        }
    }

    fn into_message(self) -> ChatMessage {
        ChatMessage {
            role: match self.role.as_str() {
                "assistant" => MessageRole::Assistant,
                _ => MessageRole::User,
            },
            content: self.content,
            placeholder: self.is_thinking,
            resolution_prompt: self.show_resolution_buttons,
            related: self.related,
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(false))
}

fn lenient_messages<'de, D>(deserializer: D) -> Result<Vec<DraftMessageDto>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

fn lenient_prefill<'de, D>(deserializer: D) -> Result<PrefillDto, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_preserves_session() {
        let mut session = ChatSession::new();
        session.intake.name = "Ann".to_string();
        session.intake.email = "a@x.com".to_string();
        session.intake.subject = "Billing issue".to_string();
        session.intake.category = SupportCategory::Billing;
        session.started = true;
        session.pending_input = "half-typed".to_string();
        session.append_message(ChatMessage::assistant("hello"));
        session.append_message(ChatMessage::user("hi"));
        session.append_message(ChatMessage::placeholder());

        let dto = DraftDto::from_session(&session);
        let restored = dto.into_session();

        assert_eq!(restored, session);
    }

    #[test]
    fn test_browser_slot_field_names() {
        let mut session = ChatSession::new();
        session.append_message(ChatMessage::placeholder());
        let value = serde_json::to_value(DraftDto::from_session(&session)).unwrap();

        assert!(value.get("sessionId").is_some());
        assert!(value.get("input").is_some());
        assert!(value.get("prefill").is_some());
        assert!(value.get("started").is_some());
        assert_eq!(value["messages"][0]["isThinking"], json!(true));
        assert_eq!(value["messages"][0]["showResolutionButtons"], json!(false));
    }

    #[test]
    fn test_partial_recovery_field_by_field() {
        let dto: DraftDto = serde_json::from_value(json!({
            "sessionId": 42,
            "messages": "not an array",
            "input": ["not", "a", "string"],
            "prefill": {"name": "Ann", "category": "Billing"},
            "started": "yes"
        }))
        .unwrap();
        let session = dto.into_session();

        assert!(!session.id.is_empty()); // fresh identity
        assert!(session.messages.is_empty());
        assert!(session.pending_input.is_empty());
        assert!(!session.started);
        assert_eq!(session.intake.name, "Ann");
        assert_eq!(session.intake.category, SupportCategory::Billing);
    }

    #[test]
    fn test_unknown_category_falls_back_to_default() {
        let dto: DraftDto = serde_json::from_value(json!({
            "prefill": {"category": "Complaints"}
        }))
        .unwrap();
        assert_eq!(dto.into_session().intake.category, SupportCategory::General);
    }

    #[test]
    fn test_unknown_role_falls_back_to_user() {
        let dto: DraftDto = serde_json::from_value(json!({
            "messages": [{"role": "robot", "content": "hi"}]
        }))
        .unwrap();
        let session = dto.into_session();
        assert_eq!(session.messages[0].role, MessageRole::User);
    }

    #[test]
    fn test_malformed_message_entries_are_skipped() {
        let dto: DraftDto = serde_json::from_value(json!({
            "messages": [
                {"role": "assistant", "content": "kept"},
                "garbage",
                17
            ]
        }))
        .unwrap();
        let session = dto.into_session();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "kept");
    }
}
