//! Conversation driver
//!
//! Feeds user input into the typed flows, stores the next state and turns
//! a completed draft into a persisted row. The session is taken out of the
//! store before advancing, so a persistence error leaves the user with no
//! flow in progress.

use anyhow::{Context, Result};
use log::{info, warn};

use super::components::ComponentAction;
use super::context::CommandContext;
use super::handlers::events::{delete_button, event_card};
use super::handlers::reminders::{reminder_buttons, reminder_card};
use super::handlers::tasks::{task_buttons, task_card};
use crate::core::{Button, ButtonKind, Reply};
use crate::database::{EventCategory, NewEvent, NewReminder, NewTask, User};
use crate::features::conversation::is_cancel;
use crate::features::reminders::sync_timer;
use crate::features::{NewCalendarEvent, Session, Transition};

pub const BROADCAST_PROMPT: &str =
    "📢 Send the message to deliver to every user, or `cancel` to stop.";

const CANCELLED: &str = "❌ Cancelled.";

/// Prompt for the current step, with the buttons that step accepts
pub fn prompt_reply(session: &Session, prompt: impl Into<String>) -> Reply {
    let mut reply = Reply::text(prompt);
    if let Session::Event(flow) = session {
        if flow.awaiting_category() {
            reply = reply.with_row(
                EventCategory::ALL
                    .iter()
                    .map(|category| {
                        Button::new(
                            ComponentAction::EventCategory(*category).custom_id(),
                            format!("{} {}", category.emoji(), category_label(*category)),
                            ButtonKind::Primary,
                        )
                    })
                    .collect(),
            );
        }
    }
    reply.with_row(vec![Button::new(
        ComponentAction::FlowCancel.custom_id(),
        "🔙 Cancel",
        ButtonKind::Secondary,
    )])
}

fn category_label(category: EventCategory) -> &'static str {
    match category {
        EventCategory::Institutional => "Institutional",
        EventCategory::Personal => "Personal",
        EventCategory::Exam => "Exam",
    }
}

fn session_prompt(session: &Session) -> String {
    match session {
        Session::Task(flow) => flow.prompt(),
        Session::Reminder(flow) => flow.prompt(),
        Session::Event(flow) => flow.prompt(),
        Session::Broadcast => BROADCAST_PROMPT.to_string(),
    }
}

enum Settled<D> {
    Reply(Reply),
    Complete(D),
}

/// Store the next state of a flow and build the reply for it
fn settle<S, D>(
    ctx: &CommandContext,
    user: &User,
    transition: Transition<S, D>,
    wrap: fn(S) -> Session,
) -> Settled<D> {
    match transition {
        Transition::Continue { state, prompt } => {
            let session = wrap(state);
            let reply = prompt_reply(&session, prompt);
            ctx.sessions.put(user.external_id, session);
            Settled::Reply(reply)
        }
        Transition::Invalid { state, error } => {
            let session = wrap(state);
            let reply = prompt_reply(&session, format!("❌ {error}\n\n{}", session_prompt(&session)));
            ctx.sessions.put(user.external_id, session);
            Settled::Reply(reply)
        }
        Transition::Cancelled => Settled::Reply(Reply::text(CANCELLED)),
        Transition::Complete(draft) => Settled::Complete(draft),
    }
}

/// Advance `session` with one line of input. The session must already be
/// removed from the store.
pub async fn advance(
    ctx: &CommandContext,
    user: &User,
    session: Session,
    input: &str,
) -> Result<Vec<Reply>> {
    let flow_ctx = ctx.flow_context();
    let reply = match session {
        Session::Task(flow) => match settle(ctx, user, flow.advance(input, &flow_ctx), Session::Task) {
            Settled::Reply(reply) => reply,
            Settled::Complete(draft) => finish_task(ctx, user, draft).await?,
        },
        Session::Reminder(flow) => {
            match settle(ctx, user, flow.advance(input, &flow_ctx), Session::Reminder) {
                Settled::Reply(reply) => reply,
                Settled::Complete(draft) => finish_reminder(ctx, user, draft).await?,
            }
        }
        Session::Event(flow) => match settle(ctx, user, flow.advance(input, &flow_ctx), Session::Event) {
            Settled::Reply(reply) => reply,
            Settled::Complete(draft) => finish_event(ctx, user, draft).await?,
        },
        Session::Broadcast => {
            if is_cancel(input) {
                Reply::text(CANCELLED)
            } else if input.trim().is_empty() {
                let session = Session::Broadcast;
                let reply = prompt_reply(&session, BROADCAST_PROMPT);
                ctx.sessions.put(user.external_id, session);
                reply
            } else {
                return run_broadcast(ctx, input.trim()).await;
            }
        }
    };
    Ok(vec![reply])
}

pub async fn run_broadcast(ctx: &CommandContext, text: &str) -> Result<Vec<Reply>> {
    let users = ctx.database.users().list_all().await?;
    let report = ctx.broadcaster.broadcast(&users, text).await;
    Ok(vec![Reply::text(report.summary())])
}

async fn finish_task(ctx: &CommandContext, user: &User, draft: NewTask) -> Result<Reply> {
    let task = ctx
        .database
        .tasks()
        .create(user.id, &draft)
        .await
        .context("Failed to save task")?;
    ctx.refresh_stats(user.id).await;
    info!("📝 Task {} created by {}", task.id, user.external_id);

    Ok(Reply::text(format!(
        "✅ **Task created!**\n\n{}",
        task_card(&task, ctx.offset)
    ))
    .with_row(task_buttons(&task)))
}

async fn finish_reminder(ctx: &CommandContext, user: &User, draft: NewReminder) -> Result<Reply> {
    let reminder = ctx
        .database
        .reminders()
        .create(user.id, &draft)
        .await
        .context("Failed to save reminder")?;
    sync_timer(&ctx.scheduler, &reminder);
    ctx.refresh_stats(user.id).await;
    info!(
        "⏰ Reminder {} created by {} for {}",
        reminder.id, user.external_id, reminder.scheduled_time
    );

    Ok(Reply::text(format!(
        "✅ **Reminder set!**\n\n{}",
        reminder_card(&reminder, ctx.offset)
    ))
    .with_row(reminder_buttons(&reminder)))
}

async fn finish_event(ctx: &CommandContext, user: &User, draft: NewEvent) -> Result<Reply> {
    let mut event = ctx
        .database
        .events()
        .create(user.id, &draft)
        .await
        .context("Failed to save event")?;

    let payload = NewCalendarEvent::from_event(&event, user.external_id);
    match ctx.calendar.create_event(&payload).await {
        Ok(Some(remote)) => match ctx.database.events().set_external_id(event.id, &remote).await {
            Ok(_) => event.external_id = Some(remote),
            Err(e) => warn!("📅 Could not store calendar id for event {}: {e:#}", event.id),
        },
        Ok(None) => {}
        Err(e) => warn!("📅 Calendar sync for event {} failed: {e:#}", event.id),
    }
    ctx.refresh_stats(user.id).await;
    info!("📅 Event {} created by {}", event.id, user.external_id);

    Ok(Reply::text(format!(
        "✅ **Event created!**\n\n{}",
        event_card(&event, ctx.offset)
    ))
    .with_row(vec![delete_button(&event)]))
}
