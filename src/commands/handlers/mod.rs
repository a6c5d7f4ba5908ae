//! Per-command handler implementations
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Task, reminder, event, statistics and admin handlers
//! - 1.0.0: Initial extraction into per-command modules

pub mod admin;
pub mod events;
pub mod reminders;
pub mod start;
pub mod stats;
pub mod tasks;

use std::sync::Arc;

use super::components::ComponentAction;
use super::handler::CommandHandler;
use crate::core::{Button, ButtonKind, Reply};

/// Items shown per page in task and reminder listings
pub const PAGE_SIZE: usize = 3;

/// Create all registered command handlers
pub fn create_all_handlers() -> Vec<Arc<dyn CommandHandler>> {
    vec![
        Arc::new(start::StartHandler),
        Arc::new(tasks::TasksHandler),
        Arc::new(reminders::RemindersHandler),
        Arc::new(events::EventsHandler),
        Arc::new(stats::StatsHandler),
        Arc::new(admin::AdminHandler),
    ]
}

/// One page of a listing
pub(crate) struct Page<'a, T> {
    pub items: &'a [T],
    pub number: usize,
    pub total: usize,
}

/// Slice `items` into pages of [`PAGE_SIZE`]; out-of-range pages clamp to the nearest one
pub(crate) fn paginate<T>(items: &[T], page: usize) -> Page<'_, T> {
    let total = items.len().div_ceil(PAGE_SIZE).max(1);
    let number = page.clamp(1, total);
    let start = (number - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(items.len());
    Page {
        items: &items[start..end],
        number,
        total,
    }
}

/// Back / indicator / next buttons; empty for single-page listings
pub(crate) fn pagination_row<T>(
    page: &Page<'_, T>,
    to_action: fn(usize) -> ComponentAction,
) -> Vec<Button> {
    if page.total <= 1 {
        return Vec::new();
    }
    let mut row = Vec::new();
    if page.number > 1 {
        row.push(Button::new(
            to_action(page.number - 1).custom_id(),
            "◀️ Back",
            ButtonKind::Secondary,
        ));
    }
    row.push(
        Button::new(
            to_action(page.number).custom_id(),
            format!("{}/{}", page.number, page.total),
            ButtonKind::Secondary,
        )
        .disabled(true),
    );
    if page.number < page.total {
        row.push(Button::new(
            to_action(page.number + 1).custom_id(),
            "Next ▶️",
            ButtonKind::Secondary,
        ));
    }
    row
}

pub(crate) fn not_found(what: &str) -> Reply {
    Reply::text(format!("🔍 {what} not found. It may have been deleted."))
}

/// Page number argument, defaulting to the first page
pub(crate) fn page_arg(raw: Option<&str>) -> usize {
    raw.and_then(|p| p.parse::<usize>().ok()).unwrap_or(1).max(1)
}
