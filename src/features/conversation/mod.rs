//! # Feature: Conversations
//!
//! Typed multi-step data entry. Each flow is an enum whose variants hold
//! exactly what has been collected so far; `advance` consumes the state and
//! one line of user input and returns the next [`Transition`].
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Task, reminder and event flows with per-user session store

pub mod event;
pub mod reminder;
pub mod session;
pub mod task;

pub use event::EventFlow;
pub use reminder::ReminderFlow;
pub use session::{Session, SessionStore};
pub use task::TaskFlow;

use chrono::{DateTime, FixedOffset, Utc};

use crate::core::ValidationError;

pub const MAX_TITLE_LEN: usize = 200;

/// What a flow needs to know about the world
#[derive(Debug, Clone, Copy)]
pub struct FlowContext {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<S, D> {
    /// Input accepted, ask the next question
    Continue { state: S, prompt: String },
    /// Input rejected, stay on the same step
    Invalid { state: S, error: ValidationError },
    Complete(D),
    Cancelled,
}

pub fn is_cancel(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "cancel" | "/cancel" | "🔙 cancel"
    )
}

pub fn is_skip(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "skip" | "/skip" | "-")
}

pub(crate) fn validate_title(input: &str) -> Result<String, ValidationError> {
    let title = input.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong { max: MAX_TITLE_LEN });
    }
    Ok(title.to_string())
}

/// Free text that may be skipped
pub(crate) fn optional_text(input: &str) -> Option<String> {
    if is_skip(input) {
        return None;
    }
    let text = input.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub(crate) const DATE_HINT: &str = "Format: DD.MM.YYYY HH:MM (for example 25.12.2025 18:30)";
pub(crate) const SKIP_HINT: &str = "Send `skip` to leave it empty.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_and_skip_keywords() {
        assert!(is_cancel("cancel"));
        assert!(is_cancel(" /Cancel "));
        assert!(!is_cancel("cancel my exam"));
        assert!(is_skip("/skip"));
        assert!(is_skip("-"));
        assert!(!is_skip("skipping rope"));
    }

    #[test]
    fn test_title_validation() {
        assert_eq!(validate_title("  Essay  "), Ok("Essay".to_string()));
        assert_eq!(validate_title("   "), Err(ValidationError::EmptyTitle));
        assert_eq!(
            validate_title(&"x".repeat(MAX_TITLE_LEN + 1)),
            Err(ValidationError::TitleTooLong { max: MAX_TITLE_LEN })
        );
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("skip"), None);
        assert_eq!(optional_text("  "), None);
        assert_eq!(optional_text(" notes "), Some("notes".to_string()));
    }
}
