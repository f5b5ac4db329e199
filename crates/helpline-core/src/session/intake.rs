//! Customer intake types.
//!
//! The intake record is the customer-provided metadata collected before a
//! conversation starts. It is attached to every outbound chat event.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Support request category offered on the intake form.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum SupportCategory {
    #[default]
    General,
    Technical,
    Billing,
    Account,
}

/// The customer-provided metadata for one support conversation.
///
/// Mutable only before the session is started; afterwards the fields are
/// frozen as sent metadata, though they continue to be transmitted with
/// every outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub category: SupportCategory,
}

impl IntakeRecord {
    /// Whether this record is sufficient to start a session.
    ///
    /// Only `name` and `subject` are required; an email address is optional.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.subject.is_empty()
    }

    /// Whether the customer has typed anything into the intake form yet.
    ///
    /// Used by the unsaved-state guard while the session is not started.
    pub fn is_dirty(&self) -> bool {
        !self.name.is_empty() || !self.email.is_empty() || !self.subject.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validity_requires_name_and_subject() {
        let mut intake = IntakeRecord::default();
        assert!(!intake.is_valid());

        intake.name = "Ann".to_string();
        assert!(!intake.is_valid());

        intake.subject = "Billing issue".to_string();
        assert!(intake.is_valid());

        // Email is optional
        assert!(intake.email.is_empty());
    }

    #[test]
    fn test_dirty_tracks_any_field() {
        let mut intake = IntakeRecord::default();
        assert!(!intake.is_dirty());

        intake.email = "a@x.com".to_string();
        assert!(intake.is_dirty());
    }

    #[test]
    fn test_category_wire_spelling() {
        assert_eq!(SupportCategory::General.to_string(), "General");
        assert_eq!(SupportCategory::Billing.to_string(), "Billing");
        assert_eq!(
            SupportCategory::from_str("technical").unwrap(),
            SupportCategory::Technical
        );
        assert!(SupportCategory::from_str("Unknown").is_err());
    }
}
