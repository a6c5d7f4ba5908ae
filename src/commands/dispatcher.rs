//! Input routing
//!
//! Every inbound interaction becomes an [`Input`]. The dispatcher registers
//! the caller, enforces admin-only commands and routes text to the caller's
//! open flow and button clicks to the owning handler.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use super::components::ComponentAction;
use super::context::CommandContext;
use super::flows;
use super::handler::CommandRequest;
use super::handlers::{events, reminders, tasks};
use super::registry::CommandRegistry;
use crate::core::Reply;
use crate::database::User;
use crate::features::Session;

/// The chat user behind an input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub external_id: u64,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(external_id: u64) -> Self {
        Self {
            external_id,
            ..Default::default()
        }
    }

    pub fn with_names(
        external_id: u64,
        username: impl Into<String>,
        display_name: Option<String>,
    ) -> Self {
        Self {
            external_id,
            username: Some(username.into()),
            display_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command { name: String, args: String },
    /// Free text, usually an answer to a flow prompt
    Text(String),
    /// Custom id of a clicked button
    Button(String),
}

const UNKNOWN_TEXT: &str = "🤔 I'm not waiting for an answer right now. Send /help to see what I can do.";
const STALE_BUTTON: &str = "⚠️ This button is no longer active.";

pub struct Dispatcher {
    ctx: Arc<CommandContext>,
    registry: CommandRegistry,
}

impl Dispatcher {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self::with_registry(ctx, CommandRegistry::with_all_handlers())
    }

    pub fn with_registry(ctx: Arc<CommandContext>, registry: CommandRegistry) -> Self {
        Self { ctx, registry }
    }

    pub fn context(&self) -> &Arc<CommandContext> {
        &self.ctx
    }

    /// Text typed as `/name args` becomes a command when `name` is registered
    pub fn parse_text(&self, text: &str) -> Input {
        if let Some(rest) = text.trim().strip_prefix('/') {
            let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if self.registry.contains(name) {
                return Input::Command {
                    name: name.to_string(),
                    args: args.trim().to_string(),
                };
            }
        }
        Input::Text(text.to_string())
    }

    pub async fn dispatch(&self, actor: &Actor, input: Input) -> Result<Vec<Reply>> {
        let user = self
            .ctx
            .database
            .users()
            .get_or_create(
                actor.external_id,
                actor.username.as_deref(),
                actor.display_name.as_deref(),
            )
            .await?;

        match input {
            Input::Command { name, args } => self.run_command(user, name, args).await,
            Input::Text(text) => match self.ctx.sessions.take(user.external_id) {
                Some(session) => {
                    debug!(
                        "Advancing {} flow for {}",
                        session.name(),
                        user.external_id
                    );
                    flows::advance(&self.ctx, &user, session, &text).await
                }
                None => Ok(vec![Reply::text(UNKNOWN_TEXT)]),
            },
            Input::Button(custom_id) => self.press(&user, &custom_id).await,
        }
    }

    async fn run_command(&self, user: User, name: String, args: String) -> Result<Vec<Reply>> {
        let request_id = Uuid::new_v4();
        let Some(handler) = self.registry.get(&name) else {
            warn!("[{request_id}] Unknown command /{name}");
            return Ok(vec![Reply::text(format!(
                "❓ Unknown command /{name}. Send /help for the list."
            ))]);
        };

        if handler.admin_only() && !user.role.is_admin() {
            info!(
                "[{request_id}] Denied /{name} for non-admin {}",
                user.external_id
            );
            return Ok(vec![Reply::text(
                "⛔ This command is only available to administrators.",
            )]);
        }

        // Any new command abandons the flow in progress; /cancel reports on it itself
        if name != "cancel" && self.ctx.sessions.cancel(user.external_id) {
            debug!("[{request_id}] Abandoned flow of {}", user.external_id);
        }

        info!("[{request_id}] /{name} from {}", user.external_id);
        let request = CommandRequest {
            name,
            args,
            user,
            request_id,
        };
        handler.handle(Arc::clone(&self.ctx), &request).await
    }

    async fn press(&self, user: &User, custom_id: &str) -> Result<Vec<Reply>> {
        let Some(action) = ComponentAction::parse(custom_id) else {
            warn!("Unknown button '{custom_id}' from {}", user.external_id);
            return Ok(vec![Reply::text(STALE_BUTTON)]);
        };
        debug!("Button {action:?} from {}", user.external_id);

        let ctx = &self.ctx;
        let reply = match action {
            ComponentAction::TaskComplete(_)
            | ComponentAction::TaskProgress(_)
            | ComponentAction::TaskCancel(_)
            | ComponentAction::TaskDelete(_)
            | ComponentAction::TaskPage(_) => tasks::handle_action(ctx, user, action).await?,
            ComponentAction::ReminderToggle(_)
            | ComponentAction::ReminderDelete(_)
            | ComponentAction::ReminderPage(_) => {
                reminders::handle_action(ctx, user, action).await?
            }
            ComponentAction::EventDelete(_) => events::handle_action(ctx, user, action).await?,
            ComponentAction::EventCategory(category) => {
                match ctx.sessions.take(user.external_id) {
                    Some(Session::Event(flow)) if flow.awaiting_category() => {
                        return flows::advance(ctx, user, Session::Event(flow), category.as_str())
                            .await;
                    }
                    Some(other) => {
                        ctx.sessions.put(user.external_id, other);
                        Reply::text(STALE_BUTTON)
                    }
                    None => Reply::text(STALE_BUTTON),
                }
            }
            ComponentAction::FlowCancel => {
                if ctx.sessions.cancel(user.external_id) {
                    Reply::text("❌ Cancelled.")
                } else {
                    Reply::text("Nothing to cancel.")
                }
            }
        };
        Ok(vec![reply])
    }
}
