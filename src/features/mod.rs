//! Feature modules
//!
//! Each feature is self-contained and talks to chat only through the
//! `core::Notifier` and `core::Reply` seams.

pub mod analytics;
pub mod broadcast;
pub mod calendar;
pub mod conversation;
pub mod reminders;

pub use analytics::SystemSnapshot;
pub use broadcast::{BroadcastReport, Broadcaster};
pub use calendar::{CalendarSync, NewCalendarEvent, NoopCalendar, WebhookCalendar};
pub use conversation::{EventFlow, FlowContext, ReminderFlow, Session, SessionStore, TaskFlow, Transition};
pub use reminders::{sync_timer, NotifierDelivery, ReminderDelivery, ReminderScheduler};
