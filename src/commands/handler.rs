//! Command handler trait and infrastructure
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Transport-neutral requests and replies, admin gating
//! - 1.0.0: Initial implementation for modular command handling

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::context::CommandContext;
use crate::core::Reply;
use crate::database::User;

/// A resolved command invocation
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    /// Everything after the command name, trimmed
    pub args: String,
    /// Caller, already registered in the store
    pub user: User,
    pub request_id: Uuid,
}

impl CommandRequest {
    /// First whitespace-separated argument
    pub fn first_arg(&self) -> Option<&str> {
        self.args.split_whitespace().next()
    }
}

/// Trait for command handlers
///
/// Each handler processes one or more commands. Handlers are registered with
/// a CommandRegistry and dispatched based on command name.
///
/// # Example
///
/// ```ignore
/// pub struct PingHandler;
///
/// #[async_trait]
/// impl CommandHandler for PingHandler {
///     fn command_names(&self) -> &'static [&'static str] {
///         &["ping"]
///     }
///
///     async fn handle(&self, ctx: Arc<CommandContext>, req: &CommandRequest) -> Result<Vec<Reply>> {
///         Ok(vec![Reply::text("pong")])
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Command name(s) this handler processes
    fn command_names(&self) -> &'static [&'static str];

    /// Restrict to admins and the superadmin
    fn admin_only(&self) -> bool {
        false
    }

    async fn handle(&self, ctx: Arc<CommandContext>, req: &CommandRequest) -> Result<Vec<Reply>>;
}

