//! Shared context for command handlers
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Scheduler, sessions, calendar and broadcast collaborators
//! - 1.0.0: Initial implementation with core shared state

use chrono::{DateTime, FixedOffset, Utc};
use dashmap::DashMap;
use log::warn;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::Clock;
use crate::database::Database;
use crate::features::{Broadcaster, CalendarSync, FlowContext, ReminderScheduler, SessionStore};

/// Shared context for all command handlers
///
/// Contains the services most handlers need:
/// - Database for persistence
/// - ReminderScheduler, paired with every reminder mutation
/// - SessionStore for in-progress conversations
/// - Broadcaster and CalendarSync collaborators
#[derive(Clone)]
pub struct CommandContext {
    pub database: Database,
    pub scheduler: ReminderScheduler,
    pub sessions: SessionStore,
    pub broadcaster: Broadcaster,
    pub calendar: Arc<dyn CalendarSync>,
    pub clock: Arc<dyn Clock>,
    /// Offset used to read and print wall-clock times
    pub offset: FixedOffset,
    pub database_path: String,
    pub start_time: std::time::Instant,
    /// Serialises a reminder's store write with its timer update
    reminder_locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl CommandContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        database: Database,
        scheduler: ReminderScheduler,
        broadcaster: Broadcaster,
        calendar: Arc<dyn CalendarSync>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        database_path: impl Into<String>,
    ) -> Self {
        Self {
            database,
            scheduler,
            sessions: SessionStore::new(),
            broadcaster,
            calendar,
            clock,
            offset,
            database_path: database_path.into(),
            start_time: std::time::Instant::now(),
            reminder_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn flow_context(&self) -> FlowContext {
        FlowContext {
            now: self.now(),
            offset: self.offset,
        }
    }

    pub fn format_time(&self, instant: DateTime<Utc>) -> String {
        crate::core::time::format_local(instant, self.offset)
    }

    /// Hold while mutating a reminder and its timer
    pub async fn lock_reminder(&self, id: i64) -> OwnedMutexGuard<()> {
        let lock = self.reminder_locks.entry(id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry once the reminder is gone
    pub fn forget_reminder(&self, id: i64) {
        self.reminder_locks.remove(&id);
    }

    /// Recompute a user's counters after a change. Failures only cost freshness.
    pub async fn refresh_stats(&self, user_id: i64) {
        if let Err(e) = self.database.statistics().refresh(user_id, self.now()).await {
            warn!("Statistics refresh for user {user_id} failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_context_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<CommandContext>();
    }

    #[tokio::test]
    async fn test_reminder_lock_is_exclusive_per_id() {
        let h = crate::commands::test_support::harness().await;
        let ctx = h.ctx.clone();

        let held = ctx.lock_reminder(7).await;
        let other = ctx.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.lock_reminder(7).await;
        });
        // A different id is never blocked
        let _unrelated = ctx.lock_reminder(8).await;

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(held);
        waiter.await.unwrap();
    }
}
