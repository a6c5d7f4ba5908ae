//! Reminder command handlers
//!
//! Handles: add_reminder, my_reminders, reminder buttons
//!
//! Every mutation that changes `is_active` or removes a row is paired with
//! the matching scheduler call before the reply goes out.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Toggle and delete keep the timer table in sync
//! - 1.0.0: Extracted from the monolithic command handler

use anyhow::Result;
use async_trait::async_trait;
use chrono::FixedOffset;
use log::info;
use std::sync::Arc;

use super::{not_found, page_arg, paginate, pagination_row};
use crate::commands::components::ComponentAction;
use crate::commands::context::CommandContext;
use crate::commands::flows::prompt_reply;
use crate::commands::handler::{CommandHandler, CommandRequest};
use crate::core::time::format_local;
use crate::core::{Button, ButtonKind, Reply};
use crate::database::{Reminder, User};
use crate::features::reminders::sync_timer;
use crate::features::{ReminderFlow, Session};

pub struct RemindersHandler;

#[async_trait]
impl CommandHandler for RemindersHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["add_reminder", "my_reminders"]
    }

    async fn handle(&self, ctx: Arc<CommandContext>, req: &CommandRequest) -> Result<Vec<Reply>> {
        match req.name.as_str() {
            "add_reminder" => {
                let (flow, prompt) = ReminderFlow::start();
                let session = Session::Reminder(flow);
                let reply = prompt_reply(&session, prompt);
                ctx.sessions.begin(req.user.external_id, session);
                Ok(vec![reply])
            }
            "my_reminders" => {
                let page = page_arg(req.first_arg());
                Ok(vec![list_page(&ctx, &req.user, page).await?])
            }
            _ => Ok(Vec::new()),
        }
    }
}

pub(crate) fn reminder_card(reminder: &Reminder, offset: FixedOffset) -> String {
    let bell = if reminder.is_active { "🔔" } else { "🔕" };
    let mut card = format!("{bell} **{}** `#{}`\n", reminder.title, reminder.id);
    card.push_str(&format!(
        "🕐 {}\n",
        format_local(reminder.scheduled_time, offset)
    ));
    if let Some(description) = &reminder.description {
        card.push_str(&format!("📝 {description}\n"));
    }
    if let Some(sent) = reminder.triggered_at {
        card.push_str(&format!("📨 Sent {}\n", format_local(sent, offset)));
    }
    card
}

pub(crate) fn reminder_buttons(reminder: &Reminder) -> Vec<Button> {
    let id = reminder.id;
    let (label, kind) = if reminder.is_active {
        (format!("⏸️ Pause #{id}"), ButtonKind::Secondary)
    } else {
        (format!("▶️ Resume #{id}"), ButtonKind::Success)
    };
    vec![
        Button::new(ComponentAction::ReminderToggle(id).custom_id(), label, kind),
        Button::new(
            ComponentAction::ReminderDelete(id).custom_id(),
            format!("🗑️ #{id}"),
            ButtonKind::Danger,
        ),
    ]
}

pub(crate) async fn list_page(ctx: &CommandContext, user: &User, page: usize) -> Result<Reply> {
    let reminders = ctx.database.reminders().list_for_user(user.id, false).await?;
    if reminders.is_empty() {
        return Ok(Reply::text(
            "📭 You have no reminders. Create one with /add_reminder.",
        ));
    }

    let page = paginate(&reminders, page);
    let mut text = format!("🔔 **Your reminders** ({} total)\n\n", reminders.len());
    let mut reply = Reply::default();
    for reminder in page.items {
        text.push_str(&reminder_card(reminder, ctx.offset));
        text.push('\n');
        reply = reply.with_row(reminder_buttons(reminder));
    }
    reply.text = text;
    Ok(reply.with_row(pagination_row(&page, ComponentAction::ReminderPage)))
}

async fn owned(ctx: &CommandContext, user: &User, id: i64) -> Result<Option<Reminder>> {
    Ok(ctx
        .database
        .reminders()
        .get_by_id(id)
        .await?
        .filter(|reminder| reminder.user_id == user.id))
}

pub(crate) async fn handle_action(
    ctx: &CommandContext,
    user: &User,
    action: ComponentAction,
) -> Result<Reply> {
    match action {
        ComponentAction::ReminderToggle(id) => {
            let _guard = ctx.lock_reminder(id).await;
            if owned(ctx, user, id).await?.is_none() {
                return Ok(not_found("Reminder"));
            }
            let Some(reminder) = ctx.database.reminders().toggle_active(id).await? else {
                return Ok(not_found("Reminder"));
            };
            let pending = sync_timer(&ctx.scheduler, &reminder);
            ctx.refresh_stats(user.id).await;
            info!(
                "🔔 Reminder {id} is now {}",
                if reminder.is_active { "active" } else { "paused" }
            );

            let note = match (reminder.is_active, pending) {
                (false, _) => "⏸️ Reminder paused.",
                (true, true) => "▶️ Reminder resumed.",
                (true, false) => "▶️ Reminder resumed, but its time has already passed.",
            };
            Ok(Reply::text(format!(
                "{note}\n\n{}",
                reminder_card(&reminder, ctx.offset)
            ))
            .with_row(reminder_buttons(&reminder)))
        }
        ComponentAction::ReminderDelete(id) => {
            let guard = ctx.lock_reminder(id).await;
            if owned(ctx, user, id).await?.is_none() {
                return Ok(not_found("Reminder"));
            }
            if !ctx.database.reminders().delete(id).await? {
                return Ok(not_found("Reminder"));
            }
            ctx.scheduler.unschedule(id);
            drop(guard);
            ctx.forget_reminder(id);
            ctx.refresh_stats(user.id).await;
            info!("🗑️ Reminder {id} deleted by {}", user.external_id);
            Ok(Reply::text("🗑️ Reminder deleted."))
        }
        ComponentAction::ReminderPage(page) => list_page(ctx, user, page).await,
        _ => Ok(Reply::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_toggle_label_follows_state() {
        let at = Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap();
        let mut reminder = Reminder {
            id: 2,
            user_id: 1,
            title: "Pay rent".to_string(),
            description: None,
            scheduled_time: at,
            is_active: true,
            triggered_at: None,
            created_at: at,
            updated_at: at,
        };
        assert!(reminder_buttons(&reminder)[0].label.contains("Pause"));
        assert!(reminder_card(&reminder, FixedOffset::east_opt(0).unwrap()).starts_with("🔔"));

        reminder.is_active = false;
        assert!(reminder_buttons(&reminder)[0].label.contains("Resume"));
        assert_eq!(reminder_buttons(&reminder)[1].custom_id, "reminder_delete_2");
    }
}
