//! Draft repository trait.
//!
//! Defines the interface for persisting a session snapshot across a page or
//! process reload.

use async_trait::async_trait;

use super::model::ChatSession;
use crate::error::Result;

/// An abstract store for the single draft slot.
///
/// This trait defines the contract for snapshotting and recovering one
/// conversation, decoupling the controller from the specific storage
/// mechanism (e.g., a JSON file, browser local storage, an in-memory fake).
///
/// # Implementation Notes
///
/// Implementations should treat unreadable or structurally invalid content
/// as "no draft" rather than an error; the controller must always be able
/// to initialize to a valid empty state. The slot is exclusive to one
/// controller instance at a time; concurrent writers may race with
/// last-write-wins semantics.
#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Loads the draft slot.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ChatSession))`: a recoverable draft was found
    /// - `Ok(None)`: slot empty, missing, or unrecoverable
    /// - `Err(_)`: storage access failed
    async fn load(&self) -> Result<Option<ChatSession>>;

    /// Writes the current session state to the slot, replacing any
    /// previous content.
    async fn save(&self, session: &ChatSession) -> Result<()>;

    /// Erases the slot. Clearing an already-empty slot is success.
    async fn clear(&self) -> Result<()>;
}
