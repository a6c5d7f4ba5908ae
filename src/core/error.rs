//! User input validation errors
//!
//! Everything else in the crate propagates `anyhow::Error`; these are the
//! rejections a conversation answers with a re-prompt instead of a failure.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title cannot be empty.")]
    EmptyTitle,
    #[error("Title is too long (max {max} characters).")]
    TitleTooLong { max: usize },
    #[error("Could not read that date. Use the format DD.MM.YYYY HH:MM, for example 25.12.2025 18:30.")]
    InvalidDateTime,
    #[error("That time has already passed. Pick a moment in the future.")]
    TimeInPast,
    #[error("The end must be after the start.")]
    EndBeforeStart,
    #[error("Priority must be 1 (high), 2 (medium) or 3 (low).")]
    InvalidPriority,
    #[error("Unknown event type. Choose institutional, personal or exam.")]
    UnknownCategory,
}
