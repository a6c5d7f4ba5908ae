//! # Reminders Feature
//!
//! Reminder scheduling, restart reconciliation and delivery.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Timer table with per-reminder cancellation, delivery trait
//! - 1.0.0: Initial implementation

pub mod delivery;
pub mod scheduler;

pub use delivery::{reminder_message, NotifierDelivery, ReminderDelivery};
pub use scheduler::ReminderScheduler;

use crate::database::Reminder;

/// Mirror a freshly persisted reminder into the timer table
///
/// Schedules it when it is active and not yet due, unschedules it otherwise.
/// Returns whether a timer is now pending.
pub fn sync_timer(scheduler: &ReminderScheduler, reminder: &Reminder) -> bool {
    if reminder.is_active && reminder.scheduled_time >= scheduler.now() {
        scheduler.schedule(reminder.id, reminder.scheduled_time);
        true
    } else {
        scheduler.unschedule(reminder.id);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use crate::database::{Database, NewReminder};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sync_timer_follows_active_flag() {
        let db = Database::in_memory().await.unwrap();
        let now = Utc.with_ymd_and_hms(2025, 11, 30, 9, 0, 0).unwrap();
        let scheduler = ReminderScheduler::new(db.clone(), Arc::new(ManualClock::new(now)));
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        let reminder = db
            .reminders()
            .create(
                user.id,
                &NewReminder {
                    title: "lab".to_string(),
                    description: None,
                    scheduled_time: now + Duration::hours(1),
                },
            )
            .await
            .unwrap();

        assert!(sync_timer(&scheduler, &reminder));
        assert!(scheduler.is_scheduled(reminder.id));

        let off = db.reminders().toggle_active(reminder.id).await.unwrap().unwrap();
        assert!(!sync_timer(&scheduler, &off));
        assert!(!scheduler.is_scheduled(reminder.id));
    }

    #[tokio::test]
    async fn test_sync_timer_skips_elapsed_reminders() {
        let db = Database::in_memory().await.unwrap();
        let now = Utc.with_ymd_and_hms(2025, 11, 30, 9, 0, 0).unwrap();
        let scheduler = ReminderScheduler::new(db.clone(), Arc::new(ManualClock::new(now)));
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        let reminder = db
            .reminders()
            .create(
                user.id,
                &NewReminder {
                    title: "missed".to_string(),
                    description: None,
                    scheduled_time: now - Duration::minutes(5),
                },
            )
            .await
            .unwrap();

        assert!(!sync_timer(&scheduler, &reminder));
        assert_eq!(scheduler.timer_count(), 0);
    }
}
