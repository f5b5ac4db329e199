//! Session domain module.
//!
//! This module contains the session domain model, message and intake types,
//! and the draft repository interface.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`ChatSession`)
//! - `message`: Conversation message types (`MessageRole`, `ChatMessage`)
//! - `intake`: Customer intake types (`IntakeRecord`, `SupportCategory`)
//! - `repository`: Repository trait for draft persistence

mod intake;
mod message;
mod model;
mod repository;

// Re-export public API
pub use intake::{IntakeRecord, SupportCategory};
pub use message::{ChatMessage, MessageRole, PLACEHOLDER_TEXT};
pub use model::{ChatSession, new_session_id};
pub use repository::DraftRepository;
