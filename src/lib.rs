// Core layer - shared types and configuration
pub mod core;

// Features layer - scheduler, conversations, calendar, broadcast, diagnostics
pub mod features;

// Persistence
pub mod database;

// Application layer
pub mod commands;

// Discord adapter
pub mod discord_notifier;
pub mod message_components;

pub use core::Config;
pub use database::Database;
pub use features::ReminderScheduler;
