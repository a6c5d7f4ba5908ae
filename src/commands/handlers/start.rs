//! Entry point, help and cancel
//!
//! Handles: start, help, cancel

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::commands::components::ComponentAction;
use crate::commands::context::CommandContext;
use crate::commands::handler::{CommandHandler, CommandRequest};
use crate::core::{Button, ButtonKind, Reply};
use crate::database::User;

pub struct StartHandler;

#[async_trait]
impl CommandHandler for StartHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["start", "help", "cancel"]
    }

    async fn handle(&self, ctx: Arc<CommandContext>, req: &CommandRequest) -> Result<Vec<Reply>> {
        let reply = match req.name.as_str() {
            "start" => {
                info!("👋 User {} opened the menu", req.user.external_id);
                welcome(&req.user)
            }
            "help" => Reply::text(help_text(req.user.role.is_admin())),
            "cancel" => match ctx.sessions.take(req.user.external_id) {
                Some(session) => Reply::text(format!("❌ The {} flow was cancelled.", session.name())),
                None => Reply::text("Nothing to cancel."),
            },
            _ => return Ok(Vec::new()),
        };
        Ok(vec![reply])
    }
}

fn welcome(user: &User) -> Reply {
    let mut text = format!("👋 Welcome, **{}**!\n\n", user.label());
    text.push_str("📋 I keep track of your tasks, reminders and events.\n");
    if user.role.is_admin() {
        text.push_str("\n🔑 You have access to the admin panel: /admin");
    } else {
        text.push_str("Send /help to see everything I can do.");
    }

    Reply::text(text).with_row(vec![
        Button::new(
            ComponentAction::TaskPage(1).custom_id(),
            "📋 My tasks",
            ButtonKind::Primary,
        ),
        Button::new(
            ComponentAction::ReminderPage(1).custom_id(),
            "🔔 My reminders",
            ButtonKind::Primary,
        ),
    ])
}

fn help_text(is_admin: bool) -> String {
    let mut text = String::from(
        "🆘 **Commands**\n\n\
         **📝 Tasks**\n\
         /add_task - Create a task\n\
         /my_tasks - Browse your tasks\n\n\
         **🔔 Reminders**\n\
         /add_reminder - Set a reminder\n\
         /my_reminders - Browse your reminders\n\n\
         **📅 Calendar**\n\
         /add_event - Add an event\n\
         /calendar - Events for the next 7 days\n\
         /today_events - Today's events\n\n\
         **📊 Statistics**\n\
         /stats - Your statistics\n\n\
         **⚙️ General**\n\
         /start - Main menu\n\
         /help - This help\n\
         /cancel - Abort the current step-by-step entry\n",
    );
    if is_admin {
        text.push_str(
            "\n**👨‍💼 Admin**\n\
             /admin - Admin panel\n\
             /grant_admin - Make a user an administrator\n\
             /user_list - All users\n\
             /broadcast - Message every user\n\
             /users_stats - Bot-wide statistics\n\
             /system_info - Host diagnostics\n",
        );
    }
    text.push_str("\n**ℹ️ Dates** are written as DD.MM.YYYY HH:MM, for example 30.11.2025 14:30");
    text
}
