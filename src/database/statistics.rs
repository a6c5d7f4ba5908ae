use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlite::{State, Statement};

use super::{scalar, Database};
use crate::core::time::{from_db, from_db_opt, to_db};

/// Per-user counters derived from the task, reminder and event tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistic {
    pub user_id: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub total_reminders: i64,
    pub triggered_reminders: i64,
    pub total_events: i64,
    pub last_activity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Statistic {
    /// Completed share of all tasks, in percent
    pub fn completion_rate(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.completed_tasks as f64 / self.total_tasks as f64 * 100.0
        }
    }
}

/// Bot-wide totals for the admin overview
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemTotals {
    pub users: i64,
    pub admins: i64,
    pub tasks: i64,
    pub completed_tasks: i64,
    pub reminders: i64,
    pub active_reminders: i64,
    pub triggered_reminders: i64,
    pub events: i64,
}

const STAT_COLUMNS: &str = "user_id, total_tasks, completed_tasks, total_reminders, \
                            triggered_reminders, total_events, last_activity, created_at, updated_at";

fn read_statistic(stmt: &Statement) -> Result<Statistic> {
    Ok(Statistic {
        user_id: stmt.read::<i64, _>("user_id")?,
        total_tasks: stmt.read::<i64, _>("total_tasks")?,
        completed_tasks: stmt.read::<i64, _>("completed_tasks")?,
        total_reminders: stmt.read::<i64, _>("total_reminders")?,
        triggered_reminders: stmt.read::<i64, _>("triggered_reminders")?,
        total_events: stmt.read::<i64, _>("total_events")?,
        last_activity: from_db_opt(stmt.read::<Option<String>, _>("last_activity")?)?,
        created_at: from_db(&stmt.read::<String, _>("created_at")?)?,
        updated_at: from_db(&stmt.read::<String, _>("updated_at")?)?,
    })
}

pub struct Statistics<'a> {
    db: &'a Database,
}

impl<'a> Statistics<'a> {
    pub(super) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<Statistic>> {
        let conn = self.db.conn().await;
        let mut stmt =
            conn.prepare(format!("SELECT {STAT_COLUMNS} FROM statistics WHERE user_id = ?"))?;
        stmt.bind((1, user_id))?;
        match stmt.next()? {
            State::Row => Ok(Some(read_statistic(&stmt)?)),
            State::Done => Ok(None),
        }
    }

    /// Stored counters, computed on first request
    pub async fn get_or_create(&self, user_id: i64, now: DateTime<Utc>) -> Result<Statistic> {
        match self.get(user_id).await? {
            Some(stat) => Ok(stat),
            None => self.refresh(user_id, now).await,
        }
    }

    /// Recompute a user's counters from the authoritative tables
    ///
    /// Overwrites whatever was stored, so calling it twice is harmless.
    pub async fn refresh(&self, user_id: i64, now: DateTime<Utc>) -> Result<Statistic> {
        {
            let conn = self.db.conn().await;
            let mut stmt = conn.prepare(
                "INSERT INTO statistics (user_id, total_tasks, completed_tasks, total_reminders,
                                         triggered_reminders, total_events, last_activity,
                                         created_at, updated_at)
                 SELECT ?1,
                        (SELECT COUNT(*) FROM tasks WHERE user_id = ?1),
                        (SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND status = 'completed'),
                        (SELECT COUNT(*) FROM reminders WHERE user_id = ?1),
                        (SELECT COUNT(*) FROM reminders WHERE user_id = ?1 AND triggered_at IS NOT NULL),
                        (SELECT COUNT(*) FROM events WHERE user_id = ?1),
                        ?2, ?2, ?2
                 WHERE 1
                 ON CONFLICT(user_id) DO UPDATE SET
                        total_tasks = excluded.total_tasks,
                        completed_tasks = excluded.completed_tasks,
                        total_reminders = excluded.total_reminders,
                        triggered_reminders = excluded.triggered_reminders,
                        total_events = excluded.total_events,
                        last_activity = excluded.last_activity,
                        updated_at = excluded.updated_at",
            )?;
            let now = to_db(now);
            stmt.bind((1, user_id))?;
            stmt.bind((2, now.as_str()))?;
            stmt.next()?;
        }

        self.get(user_id)
            .await?
            .ok_or_else(|| anyhow!("statistics for user {user_id} missing after refresh"))
    }

    pub async fn system_totals(&self) -> Result<SystemTotals> {
        let conn = self.db.conn().await;
        Ok(SystemTotals {
            users: scalar(&conn, "SELECT COUNT(*) FROM users")?,
            admins: scalar(
                &conn,
                "SELECT COUNT(*) FROM users WHERE role IN ('admin', 'superadmin')",
            )?,
            tasks: scalar(&conn, "SELECT COUNT(*) FROM tasks")?,
            completed_tasks: scalar(&conn, "SELECT COUNT(*) FROM tasks WHERE status = 'completed'")?,
            reminders: scalar(&conn, "SELECT COUNT(*) FROM reminders")?,
            active_reminders: scalar(&conn, "SELECT COUNT(*) FROM reminders WHERE is_active = 1")?,
            triggered_reminders: scalar(
                &conn,
                "SELECT COUNT(*) FROM reminders WHERE triggered_at IS NOT NULL",
            )?,
            events: scalar(&conn, "SELECT COUNT(*) FROM events")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{NewReminder, NewTask, TaskStatus};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_refresh_overwrites_from_authoritative_counts() {
        let db = Database::in_memory().await.unwrap();
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();

        // Stale values that must not survive the refresh
        {
            let conn = db.conn().await;
            let mut stmt = conn
                .prepare(
                    "INSERT INTO statistics (user_id, total_tasks, completed_tasks, created_at, updated_at)
                     VALUES (?, 42, 40, '2025-01-01 00:00:00', '2025-01-01 00:00:00')",
                )
                .unwrap();
            stmt.bind((1, user.id)).unwrap();
            stmt.next().unwrap();
        }

        for i in 0..5 {
            let task = db
                .tasks()
                .create(
                    user.id,
                    &NewTask {
                        title: format!("task {i}"),
                        description: None,
                        priority: 3,
                        due_date: None,
                    },
                )
                .await
                .unwrap();
            if i < 3 {
                db.tasks().update_status(task.id, TaskStatus::Completed, now).await.unwrap();
            }
        }

        let stats = db.statistics().refresh(user.id, now).await.unwrap();
        assert_eq!(stats.total_tasks, 5);
        assert_eq!(stats.completed_tasks, 3);
        assert_eq!(stats.last_activity, Some(now));
        assert!((stats.completion_rate() - 60.0).abs() < 1e-9);

        let again = db.statistics().refresh(user.id, now).await.unwrap();
        assert_eq!(again, stats);
    }

    #[tokio::test]
    async fn test_get_or_create_computes_once() {
        let db = Database::in_memory().await.unwrap();
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();
        assert!(db.statistics().get(user.id).await.unwrap().is_none());

        let created = db.statistics().get_or_create(user.id, now).await.unwrap();
        assert_eq!(created.total_tasks, 0);
        assert_eq!(created.last_activity, Some(now));

        let later = now + chrono::Duration::hours(1);
        let same = db.statistics().get_or_create(user.id, later).await.unwrap();
        assert_eq!(same, created);
    }

    #[tokio::test]
    async fn test_triggered_reminders_counted_from_triggered_at() {
        let db = Database::in_memory().await.unwrap();
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap();
        let new = NewReminder {
            title: "r".to_string(),
            description: None,
            scheduled_time: now,
        };
        let fired = db.reminders().create(user.id, &new).await.unwrap();
        db.reminders().create(user.id, &new).await.unwrap();
        db.reminders().mark_triggered(fired.id, now).await.unwrap();

        let stats = db.statistics().refresh(user.id, now).await.unwrap();
        assert_eq!(stats.total_reminders, 2);
        assert_eq!(stats.triggered_reminders, 1);
        assert_eq!(stats.total_events, 0);

        let totals = db.statistics().system_totals().await.unwrap();
        assert_eq!(totals.users, 1);
        assert_eq!(totals.reminders, 2);
        assert_eq!(totals.active_reminders, 2);
        assert_eq!(totals.triggered_reminders, 1);
    }
}
