//! # Command System
//!
//! Slash commands, typed text answers and button clicks, all routed through
//! one [`Dispatcher`].
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Transport-neutral dispatcher, conversation flows and button actions
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 2.0.0: Remove bang commands, slash-only command system
//! - 1.0.0: Initial reorganization with modular command structure

pub mod components;
pub mod context;
pub mod dispatcher;
pub mod flows;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod slash;

#[cfg(test)]
mod test_support;

pub use components::ComponentAction;
pub use context::CommandContext;
pub use dispatcher::{Actor, Dispatcher, Input};
pub use handler::{CommandHandler, CommandRequest};
pub use registry::CommandRegistry;

pub use slash::{
    command_args, create_slash_commands, get_integer_option, get_string_option,
    register_global_commands, register_guild_commands,
};
