//! File-backed draft repository.
//!
//! Persists the single draft slot as one JSON file, written atomically via
//! a temp file + rename so a crash mid-write never leaves a torn slot.

use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use helpline_core::error::{HelplineError, Result};
use helpline_core::session::{ChatSession, DraftRepository};

use crate::dto::DraftDto;
use crate::paths::HelplinePaths;

/// Draft repository backed by a single JSON file.
///
/// Unreadable or structurally invalid slot content is treated as "no
/// draft"; the conversation must never fail to initialize because a prior
/// snapshot went bad.
pub struct JsonDraftRepository {
    path: PathBuf,
}

impl JsonDraftRepository {
    /// Creates a repository over the given slot file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates a repository over the platform default slot
    /// (`~/.config/helpline/draft.json`).
    pub fn from_default_path() -> Result<Self> {
        let path = HelplinePaths::draft_file()
            .map_err(|e| HelplineError::config(e.to_string()))?;
        Ok(Self::new(path))
    }
}

#[async_trait]
impl DraftRepository for JsonDraftRepository {
    async fn load(&self) -> Result<Option<ChatSession>> {
        let path = self.path.clone();
        let content = tokio::task::spawn_blocking(move || -> Result<Option<String>> {
            if !path.exists() {
                return Ok(None);
            }
            Ok(Some(fs::read_to_string(&path)?))
        })
        .await
        .map_err(|e| HelplineError::internal(format!("Failed to join task: {}", e)))??;

        let Some(content) = content else {
            return Ok(None);
        };
        if content.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<DraftDto>(&content) {
            Ok(dto) => Ok(Some(dto.into_session())),
            Err(e) => {
                // Corrupt slot: discard rather than propagate.
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable draft");
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &ChatSession) -> Result<()> {
        let json = serde_json::to_string_pretty(&DraftDto::from_session(session))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&path, &json))
            .await
            .map_err(|e| HelplineError::internal(format!("Failed to join task: {}", e)))?
    }

    async fn clear(&self) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HelplineError::from(e)),
        })
        .await
        .map_err(|e| HelplineError::internal(format!("Failed to join task: {}", e)))?
    }
}

/// Writes `content` to `path` atomically: temp file in the same directory,
/// fsync, then rename over the target.
fn atomic_write(path: &PathBuf, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| HelplineError::data_access("Draft path has no file name"))?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(content.as_bytes())?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpline_core::session::{ChatMessage, SupportCategory};
    use tempfile::TempDir;

    fn repo_in(dir: &TempDir) -> JsonDraftRepository {
        JsonDraftRepository::new(dir.path().join("draft.json"))
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);

        let mut session = ChatSession::new();
        session.intake.name = "Ann".to_string();
        session.intake.subject = "Billing issue".to_string();
        session.intake.category = SupportCategory::Billing;
        session.started = true;
        session.append_message(ChatMessage::assistant("hello"));
        session.append_message(ChatMessage::user("hi"));

        repo.save(&session).await.unwrap();
        let restored = repo.load().await.unwrap().unwrap();

        assert_eq!(restored, session);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_slot_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("draft.json");
        fs::write(&path, "{ not json").unwrap();

        let repo = JsonDraftRepository::new(path);
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_slot_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("draft.json");
        fs::write(&path, "   \n").unwrap();

        let repo = JsonDraftRepository::new(path);
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_browser_client_slot_recovers() {
        // A slot as written by the browser client.
        let fixture = r#"{
            "sessionId": "k2j4h5g6",
            "messages": [
                {"role": "assistant", "content": "Hello, Ann! How can I help you with \"Billing issue\"?"},
                {"role": "user", "content": "Why was I charged twice?"},
                {"role": "assistant", "content": "AI is thinking...", "isThinking": true}
            ],
            "input": "also, ",
            "prefill": {"name": "Ann", "email": "a@x.com", "subject": "Billing issue", "category": "Billing"},
            "started": true
        }"#;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("draft.json");
        fs::write(&path, fixture).unwrap();

        let repo = JsonDraftRepository::new(path);
        let session = repo.load().await.unwrap().unwrap();

        assert_eq!(session.id, "k2j4h5g6");
        assert_eq!(session.messages.len(), 3);
        assert!(session.messages[2].placeholder);
        assert_eq!(session.pending_input, "also, ");
        assert_eq!(session.intake.category, SupportCategory::Billing);
        assert!(session.started);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);

        repo.save(&ChatSession::new()).await.unwrap();
        repo.clear().await.unwrap();
        repo.clear().await.unwrap();

        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let repo = repo_in(&dir);
        repo.save(&ChatSession::new()).await.unwrap();

        assert!(dir.path().join("draft.json").exists());
        assert!(!dir.path().join(".draft.json.tmp").exists());
    }
}
