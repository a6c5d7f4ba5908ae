//! # Core Module
//!
//! Configuration, time handling, validation errors and transport-neutral replies.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial creation with config, clock, time, reply and response modules

pub mod clock;
pub mod config;
pub mod error;
pub mod notifier;
pub mod reply;
pub mod response;
pub mod time;

// Re-export commonly used items
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::ValidationError;
pub use notifier::Notifier;
pub use reply::{Button, ButtonKind, Reply};
pub use response::{chunk_for_message, chunk_text, MESSAGE_LIMIT};
