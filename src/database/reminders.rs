use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlite::{State, Statement};

use super::users::User;
use super::{changes, last_insert_id, Database};
use crate::core::time::{from_db, from_db_opt, to_db};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    pub is_active: bool,
    /// Set once a delivery succeeded
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_time: DateTime<Utc>,
}

/// A reminder together with the user it belongs to, as handed to delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    pub reminder: Reminder,
    pub owner: User,
}

const REMINDER_COLUMNS: &str = "id, user_id, title, description, scheduled_time, is_active, \
                                triggered_at, created_at, updated_at";

fn read_reminder(stmt: &Statement) -> Result<Reminder> {
    Ok(Reminder {
        id: stmt.read::<i64, _>("id")?,
        user_id: stmt.read::<i64, _>("user_id")?,
        title: stmt.read::<String, _>("title")?,
        description: stmt.read::<Option<String>, _>("description")?,
        scheduled_time: from_db(&stmt.read::<String, _>("scheduled_time")?)?,
        is_active: stmt.read::<i64, _>("is_active")? != 0,
        triggered_at: from_db_opt(stmt.read::<Option<String>, _>("triggered_at")?)?,
        created_at: from_db(&stmt.read::<String, _>("created_at")?)?,
        updated_at: from_db(&stmt.read::<String, _>("updated_at")?)?,
    })
}

/// Reminder storage
///
/// Holds no scheduler reference: callers pair every mutation that changes
/// `is_active` or removes a row with the matching scheduler call.
pub struct Reminders<'a> {
    db: &'a Database,
}

impl<'a> Reminders<'a> {
    pub(super) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Persist a new active reminder; past times are accepted
    pub async fn create(&self, user_id: i64, new: &NewReminder) -> Result<Reminder> {
        let now = to_db(Utc::now());
        let id = {
            let conn = self.db.conn().await;
            let mut stmt = conn.prepare(
                "INSERT INTO reminders (user_id, title, description, scheduled_time, is_active, created_at, updated_at)
                 VALUES (?, ?, ?, ?, 1, ?, ?)",
            )?;
            stmt.bind((1, user_id))?;
            stmt.bind((2, new.title.as_str()))?;
            stmt.bind((3, new.description.as_deref()))?;
            stmt.bind((4, to_db(new.scheduled_time).as_str()))?;
            stmt.bind((5, now.as_str()))?;
            stmt.bind((6, now.as_str()))?;
            stmt.next()?;
            drop(stmt);
            last_insert_id(&conn)?
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("reminder {id} missing right after insert"))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Reminder>> {
        let conn = self.db.conn().await;
        let mut stmt =
            conn.prepare(format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?"))?;
        stmt.bind((1, id))?;
        match stmt.next()? {
            State::Row => Ok(Some(read_reminder(&stmt)?)),
            State::Done => Ok(None),
        }
    }

    /// Load a reminder and resolve its owner in one go
    pub async fn get_with_owner(&self, id: i64) -> Result<Option<DueReminder>> {
        let Some(reminder) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let owner = self.db.users().get_by_id(reminder.user_id).await?;
        Ok(owner.map(|owner| DueReminder { reminder, owner }))
    }

    /// A user's reminders, latest scheduled first
    pub async fn list_for_user(&self, user_id: i64, active_only: bool) -> Result<Vec<Reminder>> {
        let conn = self.db.conn().await;
        let sql = if active_only {
            format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders WHERE user_id = ? AND is_active = 1
                 ORDER BY scheduled_time DESC, id DESC"
            )
        } else {
            format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders WHERE user_id = ?
                 ORDER BY scheduled_time DESC, id DESC"
            )
        };
        let mut stmt = conn.prepare(sql)?;
        stmt.bind((1, user_id))?;
        let mut reminders = Vec::new();
        while let State::Row = stmt.next()? {
            reminders.push(read_reminder(&stmt)?);
        }
        Ok(reminders)
    }

    /// Remove a reminder; `false` when it was already gone
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare("DELETE FROM reminders WHERE id = ?")?;
        stmt.bind((1, id))?;
        stmt.next()?;
        drop(stmt);
        Ok(changes(&conn)? > 0)
    }

    /// Flip `is_active`, leaving `scheduled_time` untouched
    pub async fn toggle_active(&self, id: i64) -> Result<Option<Reminder>> {
        let touched = {
            let conn = self.db.conn().await;
            let mut stmt = conn.prepare(
                "UPDATE reminders SET is_active = 1 - is_active, updated_at = ? WHERE id = ?",
            )?;
            stmt.bind((1, to_db(Utc::now()).as_str()))?;
            stmt.bind((2, id))?;
            stmt.next()?;
            drop(stmt);
            changes(&conn)?
        };
        if touched == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Every active reminder due at or after `now`
    pub async fn list_active_future(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare(format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders
             WHERE is_active = 1 AND scheduled_time >= ?
             ORDER BY scheduled_time"
        ))?;
        stmt.bind((1, to_db(now).as_str()))?;
        let mut reminders = Vec::new();
        while let State::Row = stmt.next()? {
            reminders.push(read_reminder(&stmt)?);
        }
        Ok(reminders)
    }

    pub async fn mark_triggered(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let conn = self.db.conn().await;
        let mut stmt =
            conn.prepare("UPDATE reminders SET triggered_at = ?, updated_at = ? WHERE id = ?")?;
        let at = to_db(at);
        stmt.bind((1, at.as_str()))?;
        stmt.bind((2, at.as_str()))?;
        stmt.bind((3, id))?;
        stmt.next()?;
        drop(stmt);
        Ok(changes(&conn)? > 0)
    }
}
