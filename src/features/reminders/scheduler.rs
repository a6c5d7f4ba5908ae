//! # Feature: Reminder Scheduler
//!
//! In-memory timer table keyed by reminder id. Every entry is one tokio task
//! that sleeps until the reminder is due, re-reads the reminder from the store
//! and hands it to the registered delivery callback.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Per-timer cancellation tokens, restart reconciliation, injectable clock
//! - 1.0.0: Initial implementation

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::delivery::ReminderDelivery;
use crate::core::Clock;
use crate::database::Database;

struct TimerEntry {
    generation: u64,
    due: DateTime<Utc>,
    token: CancellationToken,
}

struct SchedulerInner {
    database: Database,
    clock: Arc<dyn Clock>,
    delivery: OnceLock<Arc<dyn ReminderDelivery>>,
    timers: DashMap<i64, TimerEntry>,
    next_generation: AtomicU64,
    /// Parent of every timer token; replaced with a fresh one on stop
    root: RwLock<CancellationToken>,
    running: watch::Sender<bool>,
}

/// Cheaply cloneable handle to the one scheduler built in `main`
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<SchedulerInner>,
}

impl ReminderScheduler {
    pub fn new(database: Database, clock: Arc<dyn Clock>) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            inner: Arc::new(SchedulerInner {
                database,
                clock,
                delivery: OnceLock::new(),
                timers: DashMap::new(),
                next_generation: AtomicU64::new(1),
                root: RwLock::new(CancellationToken::new()),
                running,
            }),
        }
    }

    /// Register the delivery callback; only the first registration is accepted
    pub fn set_delivery(&self, delivery: Arc<dyn ReminderDelivery>) -> Result<()> {
        self.inner
            .delivery
            .set(delivery)
            .map_err(|_| anyhow!("reminder delivery callback already registered"))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Register or replace the timer for `reminder_id`
    ///
    /// Last write wins: an existing timer for the id is cancelled. A time in
    /// the past fires as soon as the scheduler is running. Must be called
    /// from within a tokio runtime.
    pub fn schedule(&self, reminder_id: i64, scheduled_time: DateTime<Utc>) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = self.root_token().child_token();
        let entry = TimerEntry {
            generation,
            due: scheduled_time,
            token: token.clone(),
        };

        if let Some(previous) = self.inner.timers.insert(reminder_id, entry) {
            previous.token.cancel();
            debug!("⏰ Replaced timer for reminder {reminder_id}");
        } else {
            debug!("⏰ Scheduled reminder {reminder_id} for {scheduled_time}");
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler
                .run_timer(reminder_id, generation, scheduled_time, token)
                .await;
        });
    }

    /// Cancel and drop the timer for `reminder_id`; `false` if there was none
    pub fn unschedule(&self, reminder_id: i64) -> bool {
        match self.inner.timers.remove(&reminder_id) {
            Some((_, entry)) => {
                entry.token.cancel();
                debug!("⏰ Unscheduled reminder {reminder_id}");
                true
            }
            None => false,
        }
    }

    /// Schedule every active reminder due at or after `now`
    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<usize> {
        let pending = self.inner.database.reminders().list_active_future(now).await?;
        for reminder in &pending {
            self.schedule(reminder.id, reminder.scheduled_time);
        }
        info!("♻️ Restored {} pending reminders", pending.len());
        Ok(pending.len())
    }

    /// Rebuild the timer table from the store after a restart
    pub async fn reconcile_on_startup(&self) -> Result<usize> {
        self.reconcile(self.now()).await
    }

    /// Let timers run; calling it again is a no-op
    pub fn start(&self) {
        if self.inner.running.send_replace(true) {
            debug!("Reminder scheduler already running");
            return;
        }
        info!(
            "⏰ Reminder scheduler started with {} pending timers",
            self.inner.timers.len()
        );
    }

    /// Cancel every pending timer at once and empty the table
    pub fn stop(&self) {
        self.inner.running.send_replace(false);
        let old_root = {
            let mut root = match self.inner.root.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::replace(&mut *root, CancellationToken::new())
        };
        old_root.cancel();
        let dropped = self.inner.timers.len();
        self.inner.timers.clear();
        info!("⏰ Reminder scheduler stopped ({dropped} timers cancelled)");
    }

    pub fn is_running(&self) -> bool {
        *self.inner.running.borrow()
    }

    pub fn is_scheduled(&self, reminder_id: i64) -> bool {
        self.inner.timers.contains_key(&reminder_id)
    }

    pub fn scheduled_time(&self, reminder_id: i64) -> Option<DateTime<Utc>> {
        self.inner.timers.get(&reminder_id).map(|entry| entry.due)
    }

    /// Ids with a pending timer, ascending
    pub fn scheduled_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.inner.timers.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn timer_count(&self) -> usize {
        self.inner.timers.len()
    }

    fn root_token(&self) -> CancellationToken {
        match self.inner.root.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Remove the entry only if it still belongs to this timer
    fn forget(&self, reminder_id: i64, generation: u64) -> bool {
        self.inner
            .timers
            .remove_if(&reminder_id, |_, entry| entry.generation == generation)
            .is_some()
    }

    async fn run_timer(
        self,
        reminder_id: i64,
        generation: u64,
        due: DateTime<Utc>,
        token: CancellationToken,
    ) {
        let mut running = self.inner.running.subscribe();
        let started = tokio::select! {
            _ = token.cancelled() => false,
            result = running.wait_for(|running| *running) => result.is_ok(),
        };
        if !started {
            self.forget(reminder_id, generation);
            return;
        }

        let delay = (due - self.now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = token.cancelled() => {
                self.forget(reminder_id, generation);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        // Lost a race with unschedule or a newer schedule
        if !self.forget(reminder_id, generation) {
            return;
        }

        self.fire(reminder_id).await;
    }

    /// One delivery attempt; failures are logged and swallowed, never retried
    async fn fire(&self, reminder_id: i64) {
        let reminders = self.inner.database.reminders();
        let due = match reminders.get_with_owner(reminder_id).await {
            Ok(Some(due)) => due,
            Ok(None) => {
                debug!("Reminder {reminder_id} was deleted before firing");
                return;
            }
            Err(e) => {
                error!("Failed to load reminder {reminder_id} at fire time: {e}");
                return;
            }
        };

        if !due.reminder.is_active {
            debug!("Reminder {reminder_id} was deactivated before firing");
            return;
        }

        let Some(delivery) = self.inner.delivery.get().cloned() else {
            warn!("No delivery callback registered, dropping reminder {reminder_id}");
            return;
        };

        match delivery.deliver(&due).await {
            Ok(()) => {
                info!(
                    "🔔 Delivered reminder {} to user {}",
                    reminder_id, due.owner.external_id
                );
                if let Err(e) = reminders.mark_triggered(reminder_id, self.now()).await {
                    warn!("Failed to record delivery of reminder {reminder_id}: {e}");
                }
            }
            Err(e) => {
                warn!(
                    "Failed to deliver reminder {} to user {}: {}",
                    reminder_id, due.owner.external_id, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use crate::database::{DueReminder, NewReminder, User};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Records every attempt and fails for the configured ids
    struct RecordingDelivery {
        attempts: mpsc::UnboundedSender<i64>,
        fail_for: HashSet<i64>,
    }

    #[async_trait]
    impl ReminderDelivery for RecordingDelivery {
        async fn deliver(&self, due: &DueReminder) -> Result<()> {
            let _ = self.attempts.send(due.reminder.id);
            if self.fail_for.contains(&due.reminder.id) {
                return Err(anyhow!("chat blocked by user"));
            }
            Ok(())
        }
    }

    struct Harness {
        db: Database,
        clock: Arc<ManualClock>,
        user: User,
        scheduler: ReminderScheduler,
        attempts: mpsc::UnboundedReceiver<i64>,
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 30, 9, 0, 0).unwrap()
    }

    async fn harness_with(db: Database, fail_for: &[i64]) -> Harness {
        let clock = Arc::new(ManualClock::new(base_time()));
        let user = db.users().get_or_create(77, Some("ana"), None).await.unwrap();
        let scheduler = ReminderScheduler::new(db.clone(), clock.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        scheduler
            .set_delivery(Arc::new(RecordingDelivery {
                attempts: tx,
                fail_for: fail_for.iter().copied().collect(),
            }))
            .unwrap();
        Harness {
            db,
            clock,
            user,
            scheduler,
            attempts: rx,
        }
    }

    async fn harness() -> Harness {
        harness_with(Database::in_memory().await.unwrap(), &[]).await
    }

    async fn create(h: &Harness, title: &str, at: DateTime<Utc>) -> i64 {
        h.db.reminders()
            .create(
                h.user.id,
                &NewReminder {
                    title: title.to_string(),
                    description: None,
                    scheduled_time: at,
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn next_attempt(rx: &mut mpsc::UnboundedReceiver<i64>) -> i64 {
        timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("delivery attempt timed out")
            .expect("delivery channel closed")
    }

    async fn settle() {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_schedule_twice_keeps_one_timer() {
        let mut h = harness().await;
        let id = create(&h, "Submit report", base_time()).await;

        h.scheduler.schedule(id, base_time() + chrono::Duration::hours(1));
        h.scheduler.schedule(id, base_time());
        assert_eq!(h.scheduler.timer_count(), 1);
        assert_eq!(h.scheduler.scheduled_time(id), Some(base_time()));

        h.scheduler.start();
        assert_eq!(next_attempt(&mut h.attempts).await, id);
        settle().await;
        assert!(h.attempts.try_recv().is_err(), "replaced timer must not fire");
        assert_eq!(h.scheduler.timer_count(), 0);
    }

    #[tokio::test]
    async fn test_unschedule_is_a_safe_no_op() {
        let h = harness().await;
        let id = create(&h, "a", base_time() + chrono::Duration::days(1)).await;

        assert!(!h.scheduler.unschedule(id));
        h.scheduler.schedule(id, base_time() + chrono::Duration::days(1));
        assert!(h.scheduler.unschedule(id));
        assert!(!h.scheduler.unschedule(id));
        assert_eq!(h.scheduler.timer_count(), 0);
    }

    #[tokio::test]
    async fn test_deleted_before_fire_delivers_nothing() {
        let mut h = harness().await;
        let id = create(&h, "gone", base_time()).await;

        h.scheduler.schedule(id, base_time());
        h.db.reminders().delete(id).await.unwrap();
        h.scheduler.start();
        settle().await;

        assert!(h.attempts.try_recv().is_err());
        assert!(!h.scheduler.is_scheduled(id));
    }

    #[tokio::test]
    async fn test_deactivated_before_fire_delivers_nothing() {
        let mut h = harness().await;
        let id = create(&h, "off", base_time()).await;

        h.scheduler.schedule(id, base_time());
        h.db.reminders().toggle_active(id).await.unwrap();
        h.scheduler.start();
        settle().await;

        assert!(h.attempts.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failing_delivery_does_not_affect_other_timers() {
        let db = Database::in_memory().await.unwrap();
        // Ids are assigned sequentially from 1 in a fresh database
        let mut h = harness_with(db, &[1]).await;
        let failing = create(&h, "blocked chat", base_time()).await;
        let healthy = create(&h, "healthy", base_time()).await;
        assert_eq!(failing, 1);

        h.scheduler.schedule(failing, base_time());
        h.scheduler.schedule(healthy, base_time() + chrono::Duration::milliseconds(150));
        h.scheduler.start();

        assert_eq!(next_attempt(&mut h.attempts).await, failing);
        assert_eq!(next_attempt(&mut h.attempts).await, healthy);
        settle().await;

        let failed = h.db.reminders().get_by_id(failing).await.unwrap().unwrap();
        let delivered = h.db.reminders().get_by_id(healthy).await.unwrap().unwrap();
        assert!(failed.triggered_at.is_none());
        assert_eq!(delivered.triggered_at, Some(base_time()));
        assert_eq!(h.scheduler.timer_count(), 0);
    }

    #[tokio::test]
    async fn test_timers_wait_for_start() {
        let mut h = harness().await;
        let id = create(&h, "early", base_time()).await;

        h.scheduler.schedule(id, base_time());
        settle().await;
        assert!(h.attempts.try_recv().is_err());
        assert!(h.scheduler.is_scheduled(id));

        h.scheduler.start();
        assert_eq!(next_attempt(&mut h.attempts).await, id);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_clears() {
        let h = harness().await;
        let id = create(&h, "a", base_time() + chrono::Duration::days(1)).await;

        h.scheduler.start();
        h.scheduler.start();
        assert!(h.scheduler.is_running());

        h.scheduler.schedule(id, base_time() + chrono::Duration::days(1));
        assert_eq!(h.scheduler.timer_count(), 1);

        h.scheduler.stop();
        assert!(!h.scheduler.is_running());
        assert_eq!(h.scheduler.timer_count(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_schedules_exactly_active_future() {
        let h = harness().await;
        let now = base_time();
        let future = create(&h, "future", now + chrono::Duration::hours(3)).await;
        let at_now = create(&h, "now", now).await;
        create(&h, "past", now - chrono::Duration::minutes(1)).await;
        let inactive = create(&h, "inactive", now + chrono::Duration::hours(5)).await;
        h.db.reminders().toggle_active(inactive).await.unwrap();
        let deleted = create(&h, "deleted", now + chrono::Duration::hours(6)).await;
        h.db.reminders().delete(deleted).await.unwrap();

        let restored = h.scheduler.reconcile(now).await.unwrap();

        assert_eq!(restored, 2);
        let mut expected = vec![future, at_now];
        expected.sort_unstable();
        assert_eq!(h.scheduler.scheduled_ids(), expected);
    }

    #[tokio::test]
    async fn test_restart_restores_pending_reminder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restart.db");
        let path = path.to_str().unwrap();

        let db = Database::new(path).await.unwrap();
        let h = harness_with(db, &[]).await;
        let due = Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap();
        let id = create(&h, "Submit report", due).await;
        h.scheduler.schedule(id, due);
        assert!(h.scheduler.is_scheduled(id));

        // Process goes away: timers die with it
        h.scheduler.stop();
        assert_eq!(h.scheduler.timer_count(), 0);
        drop(h);

        let reopened = Database::new(path).await.unwrap();
        let clock = Arc::new(ManualClock::new(base_time()));
        let scheduler = ReminderScheduler::new(reopened, clock);
        assert_eq!(scheduler.reconcile_on_startup().await.unwrap(), 1);
        assert_eq!(scheduler.scheduled_ids(), vec![id]);
        assert_eq!(scheduler.scheduled_time(id), Some(due));
    }

    #[tokio::test]
    async fn test_past_due_reminder_dropped_on_restart() {
        let mut h = harness().await;
        create(&h, "missed", base_time() - chrono::Duration::minutes(1)).await;

        assert_eq!(h.scheduler.reconcile_on_startup().await.unwrap(), 0);
        h.scheduler.start();
        settle().await;

        assert_eq!(h.scheduler.timer_count(), 0);
        assert!(h.attempts.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_future_timer_waits_for_its_time() {
        let mut h = harness().await;
        let id = create(&h, "later", base_time() + chrono::Duration::hours(1)).await;

        h.scheduler.schedule(id, base_time() + chrono::Duration::hours(1));
        h.scheduler.start();
        settle().await;

        assert!(h.attempts.try_recv().is_err());
        assert!(h.scheduler.is_scheduled(id));
    }

    #[tokio::test]
    async fn test_delay_measured_against_injected_clock() {
        let mut h = harness().await;
        let due = base_time() + chrono::Duration::hours(1);
        let id = create(&h, "overdue", due).await;

        h.clock.advance(chrono::Duration::hours(2));
        h.scheduler.schedule(id, due);
        h.scheduler.start();

        assert_eq!(next_attempt(&mut h.attempts).await, id);
    }

    #[tokio::test]
    async fn test_delivery_registered_once() {
        let h = harness().await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let second = h.scheduler.set_delivery(Arc::new(RecordingDelivery {
            attempts: tx,
            fail_for: HashSet::new(),
        }));
        assert!(second.is_err());
    }
}
