use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlite::{State, Statement};

use super::{changes, last_insert_id, Database};
use crate::core::time::{from_db, from_db_opt, to_db};

pub const DEFAULT_PRIORITY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "⏳",
            TaskStatus::InProgress => "🔄",
            TaskStatus::Completed => "✅",
            TaskStatus::Cancelled => "🚫",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// 1 is the highest priority, 3 the lowest
    pub priority: u8,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: u8,
    pub due_date: Option<DateTime<Utc>>,
}

const TASK_COLUMNS: &str = "id, user_id, title, description, priority, status, due_date, \
                            completed_at, created_at, updated_at";

fn read_task(stmt: &Statement) -> Result<Task> {
    let status_raw = stmt.read::<String, _>("status")?;
    Ok(Task {
        id: stmt.read::<i64, _>("id")?,
        user_id: stmt.read::<i64, _>("user_id")?,
        title: stmt.read::<String, _>("title")?,
        description: stmt.read::<Option<String>, _>("description")?,
        priority: stmt.read::<i64, _>("priority")?.clamp(1, 3) as u8,
        status: TaskStatus::parse(&status_raw)
            .ok_or_else(|| anyhow!("unknown task status '{status_raw}'"))?,
        due_date: from_db_opt(stmt.read::<Option<String>, _>("due_date")?)?,
        completed_at: from_db_opt(stmt.read::<Option<String>, _>("completed_at")?)?,
        created_at: from_db(&stmt.read::<String, _>("created_at")?)?,
        updated_at: from_db(&stmt.read::<String, _>("updated_at")?)?,
    })
}

fn checked_priority(priority: u8) -> Result<i64> {
    if (1..=3).contains(&priority) {
        Ok(i64::from(priority))
    } else {
        Err(anyhow!("priority {priority} outside 1..=3"))
    }
}

pub struct Tasks<'a> {
    db: &'a Database,
}

impl<'a> Tasks<'a> {
    pub(super) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, user_id: i64, new: &NewTask) -> Result<Task> {
        let priority = checked_priority(new.priority)?;
        let now = to_db(Utc::now());
        let id = {
            let conn = self.db.conn().await;
            let mut stmt = conn.prepare(
                "INSERT INTO tasks (user_id, title, description, priority, status, due_date, created_at, updated_at)
                 VALUES (?, ?, ?, ?, 'pending', ?, ?, ?)",
            )?;
            let due = new.due_date.map(to_db);
            stmt.bind((1, user_id))?;
            stmt.bind((2, new.title.as_str()))?;
            stmt.bind((3, new.description.as_deref()))?;
            stmt.bind((4, priority))?;
            stmt.bind((5, due.as_deref()))?;
            stmt.bind((6, now.as_str()))?;
            stmt.bind((7, now.as_str()))?;
            stmt.next()?;
            drop(stmt);
            last_insert_id(&conn)?
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("task {id} missing right after insert"))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Task>> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))?;
        stmt.bind((1, id))?;
        match stmt.next()? {
            State::Row => Ok(Some(read_task(&stmt)?)),
            State::Done => Ok(None),
        }
    }

    /// A user's tasks, highest priority first, newest first within a priority
    pub async fn list_for_user(
        &self,
        user_id: i64,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>> {
        let conn = self.db.conn().await;
        let mut stmt = match status {
            Some(status) => {
                let mut stmt = conn.prepare(format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ? AND status = ?
                     ORDER BY priority ASC, created_at DESC, id DESC"
                ))?;
                stmt.bind((1, user_id))?;
                stmt.bind((2, status.as_str()))?;
                stmt
            }
            None => {
                let mut stmt = conn.prepare(format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?
                     ORDER BY priority ASC, created_at DESC, id DESC"
                ))?;
                stmt.bind((1, user_id))?;
                stmt
            }
        };
        let mut tasks = Vec::new();
        while let State::Row = stmt.next()? {
            tasks.push(read_task(&stmt)?);
        }
        Ok(tasks)
    }

    pub async fn count_by_status(&self, user_id: i64, status: TaskStatus) -> Result<i64> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare("SELECT COUNT(*) AS n FROM tasks WHERE user_id = ? AND status = ?")?;
        stmt.bind((1, user_id))?;
        stmt.bind((2, status.as_str()))?;
        match stmt.next()? {
            State::Row => Ok(stmt.read::<i64, _>("n")?),
            State::Done => Ok(0),
        }
    }

    /// Move a task to `status`; `completed_at` is set on entering completed
    /// and cleared on leaving it
    pub async fn update_status(
        &self,
        id: i64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>> {
        let touched = {
            let conn = self.db.conn().await;
            let mut stmt = conn.prepare(
                "UPDATE tasks
                 SET status = ?,
                     completed_at = CASE
                         WHEN ? = 'completed' THEN COALESCE(completed_at, ?)
                         ELSE NULL
                     END,
                     updated_at = ?
                 WHERE id = ?",
            )?;
            let now = to_db(now);
            stmt.bind((1, status.as_str()))?;
            stmt.bind((2, status.as_str()))?;
            stmt.bind((3, now.as_str()))?;
            stmt.bind((4, now.as_str()))?;
            stmt.bind((5, id))?;
            stmt.next()?;
            drop(stmt);
            changes(&conn)?
        };
        if touched == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare("DELETE FROM tasks WHERE id = ?")?;
        stmt.bind((1, id))?;
        stmt.next()?;
        drop(stmt);
        Ok(changes(&conn)? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(title: &str, priority: u8) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            priority,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_pending() {
        let db = Database::in_memory().await.unwrap();
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        let created = db.tasks().create(user.id, &task("Read chapter 3", 3)).await.unwrap();

        assert_eq!(created.status, TaskStatus::Pending);
        assert_eq!(created.priority, 3);
        assert!(created.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_priority() {
        let db = Database::in_memory().await.unwrap();
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        assert!(db.tasks().create(user.id, &task("bad", 0)).await.is_err());
        assert!(db.tasks().create(user.id, &task("bad", 4)).await.is_err());
    }

    #[tokio::test]
    async fn test_completed_at_follows_status() {
        let db = Database::in_memory().await.unwrap();
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        let t = db.tasks().create(user.id, &task("essay", 1)).await.unwrap();
        let at = Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap();

        let progress = db.tasks().update_status(t.id, TaskStatus::InProgress, at).await.unwrap().unwrap();
        assert!(progress.completed_at.is_none());

        let done = db.tasks().update_status(t.id, TaskStatus::Completed, at).await.unwrap().unwrap();
        assert_eq!(done.completed_at, Some(at));

        let reopened = db.tasks().update_status(t.id, TaskStatus::Pending, at).await.unwrap().unwrap();
        assert!(reopened.completed_at.is_none());

        assert!(db.tasks().update_status(9999, TaskStatus::Completed, at).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_priority_and_filters() {
        let db = Database::in_memory().await.unwrap();
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        let low = db.tasks().create(user.id, &task("low", 3)).await.unwrap();
        let high = db.tasks().create(user.id, &task("high", 1)).await.unwrap();
        let mid = db.tasks().create(user.id, &task("mid", 2)).await.unwrap();
        db.tasks().update_status(mid.id, TaskStatus::Completed, Utc::now()).await.unwrap();

        let ids: Vec<i64> = db.tasks().list_for_user(user.id, None).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![high.id, mid.id, low.id]);

        let done = db.tasks().list_for_user(user.id, Some(TaskStatus::Completed)).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(db.tasks().count_by_status(user.id, TaskStatus::Pending).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_rows() {
        let db = Database::in_memory().await.unwrap();
        let user = db.users().get_or_create(1, None, None).await.unwrap();
        let t = db.tasks().create(user.id, &task("draft", 2)).await.unwrap();

        assert!(db.tasks().delete(t.id).await.unwrap());
        assert!(!db.tasks().delete(t.id).await.unwrap());
        assert!(db.tasks().get_by_id(t.id).await.unwrap().is_none());
    }
}
