//! Calendar command handlers
//!
//! Handles: add_event, calendar, today_events, event buttons
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::FixedOffset;
use log::{info, warn};
use std::sync::Arc;

use super::not_found;
use crate::commands::components::ComponentAction;
use crate::commands::context::CommandContext;
use crate::commands::flows::prompt_reply;
use crate::commands::handler::{CommandHandler, CommandRequest};
use crate::core::time::{format_local, local_day_bounds};
use crate::core::{Button, ButtonKind, Reply};
use crate::database::{Event, User};
use crate::features::{EventFlow, Session};

/// Days covered by the calendar command
pub const CALENDAR_DAYS: i64 = 7;

/// Delete buttons fit in a single action row
const MAX_DELETE_BUTTONS: usize = 5;

pub struct EventsHandler;

#[async_trait]
impl CommandHandler for EventsHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["add_event", "calendar", "today_events"]
    }

    async fn handle(&self, ctx: Arc<CommandContext>, req: &CommandRequest) -> Result<Vec<Reply>> {
        match req.name.as_str() {
            "add_event" => {
                let (flow, prompt) = EventFlow::start();
                let session = Session::Event(flow);
                let reply = prompt_reply(&session, prompt);
                ctx.sessions.begin(req.user.external_id, session);
                Ok(vec![reply])
            }
            "calendar" => {
                let events = ctx
                    .database
                    .events()
                    .list_upcoming(req.user.id, ctx.now(), CALENDAR_DAYS)
                    .await?;
                Ok(vec![listing(
                    &events,
                    "📅 **Your events for the next 7 days**",
                    "📭 No events in the next 7 days.",
                    ctx.offset,
                )])
            }
            "today_events" => {
                let (start, end) = local_day_bounds(ctx.now(), ctx.offset);
                let events = ctx
                    .database
                    .events()
                    .list_between(req.user.id, start, end)
                    .await?;
                Ok(vec![listing(
                    &events,
                    "📅 **Today's events**",
                    "📭 No events today.",
                    ctx.offset,
                )])
            }
            _ => Ok(Vec::new()),
        }
    }
}

pub(crate) fn event_card(event: &Event, offset: FixedOffset) -> String {
    let mut card = format!(
        "{} **{}** `#{}`\n🕐 {} → {}\n",
        event.category.emoji(),
        event.title,
        event.id,
        format_local(event.start_time, offset),
        format_local(event.end_time, offset)
    );
    if let Some(location) = &event.location {
        card.push_str(&format!("📍 {location}\n"));
    }
    if let Some(description) = &event.description {
        card.push_str(&format!("📝 {description}\n"));
    }
    card
}

pub(crate) fn delete_button(event: &Event) -> Button {
    Button::new(
        ComponentAction::EventDelete(event.id).custom_id(),
        format!("🗑️ #{}", event.id),
        ButtonKind::Danger,
    )
}

fn listing(events: &[Event], title: &str, empty: &str, offset: FixedOffset) -> Reply {
    if events.is_empty() {
        return Reply::text(empty);
    }
    let mut text = format!("{title}\n\n");
    for event in events {
        text.push_str(&event_card(event, offset));
        text.push('\n');
    }
    Reply::text(text).with_row(
        events
            .iter()
            .take(MAX_DELETE_BUTTONS)
            .map(delete_button)
            .collect(),
    )
}

pub(crate) async fn handle_action(
    ctx: &CommandContext,
    user: &User,
    action: ComponentAction,
) -> Result<Reply> {
    let ComponentAction::EventDelete(id) = action else {
        return Ok(Reply::default());
    };
    let Some(event) = ctx
        .database
        .events()
        .get_by_id(id)
        .await?
        .filter(|event| event.user_id == user.id)
    else {
        return Ok(not_found("Event"));
    };

    ctx.database.events().delete(id).await?;
    if let Some(remote) = &event.external_id {
        if let Err(e) = ctx.calendar.delete_event(remote).await {
            warn!("📅 Calendar delete for event {id} ({remote}) failed: {e:#}");
        }
    }
    ctx.refresh_stats(user.id).await;
    info!("🗑️ Event {id} deleted by {}", user.external_id);
    Ok(Reply::text("🗑️ Event deleted."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::EventCategory;
    use chrono::{Duration, TimeZone, Utc};

    fn event(id: i64) -> Event {
        let start = Utc.with_ymd_and_hms(2025, 12, 10, 6, 0, 0).unwrap();
        Event {
            id,
            user_id: 1,
            title: format!("Lecture {id}"),
            description: None,
            location: Some("Room 1".to_string()),
            start_time: start,
            end_time: start + Duration::hours(1),
            category: EventCategory::Institutional,
            external_id: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_listing_caps_delete_buttons() {
        let events: Vec<Event> = (1..=7).map(event).collect();
        let reply = listing(&events, "title", "empty", FixedOffset::east_opt(0).unwrap());
        assert_eq!(reply.rows.len(), 1);
        assert_eq!(reply.rows[0].len(), MAX_DELETE_BUTTONS);
        assert!(reply.text.contains("Lecture 7"));
        assert!(reply.text.contains("🕐 10.12.2025 06:00 → 10.12.2025 07:00"));
    }

    #[test]
    fn test_empty_listing() {
        let reply = listing(&[], "title", "📭 nothing", FixedOffset::east_opt(0).unwrap());
        assert_eq!(reply, Reply::text("📭 nothing"));
    }
}
