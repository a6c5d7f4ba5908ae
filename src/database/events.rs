use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use sqlite::{State, Statement};

use super::{changes, last_insert_id, Database};
use crate::core::time::{from_db, to_db};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// Lectures, seminars and other faculty events
    Institutional,
    Personal,
    Exam,
}

impl EventCategory {
    pub const ALL: [EventCategory; 3] = [
        EventCategory::Institutional,
        EventCategory::Personal,
        EventCategory::Exam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Institutional => "institutional",
            EventCategory::Personal => "personal",
            EventCategory::Exam => "exam",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "institutional" | "faculty" | "1" => Some(EventCategory::Institutional),
            "personal" | "2" => Some(EventCategory::Personal),
            "exam" | "3" => Some(EventCategory::Exam),
            _ => None,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            EventCategory::Institutional => "🏛️",
            EventCategory::Personal => "👤",
            EventCategory::Exam => "📝",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category: EventCategory,
    /// Correlation id returned by the calendar collaborator
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category: EventCategory,
}

const EVENT_COLUMNS: &str = "id, user_id, title, description, location, start_time, end_time, \
                             category, external_id, created_at, updated_at";

fn read_event(stmt: &Statement) -> Result<Event> {
    let category_raw = stmt.read::<String, _>("category")?;
    Ok(Event {
        id: stmt.read::<i64, _>("id")?,
        user_id: stmt.read::<i64, _>("user_id")?,
        title: stmt.read::<String, _>("title")?,
        description: stmt.read::<Option<String>, _>("description")?,
        location: stmt.read::<Option<String>, _>("location")?,
        start_time: from_db(&stmt.read::<String, _>("start_time")?)?,
        end_time: from_db(&stmt.read::<String, _>("end_time")?)?,
        category: EventCategory::parse(&category_raw)
            .ok_or_else(|| anyhow!("unknown event category '{category_raw}'"))?,
        external_id: stmt.read::<Option<String>, _>("external_id")?,
        created_at: from_db(&stmt.read::<String, _>("created_at")?)?,
        updated_at: from_db(&stmt.read::<String, _>("updated_at")?)?,
    })
}

pub struct Events<'a> {
    db: &'a Database,
}

impl<'a> Events<'a> {
    pub(super) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Persist an event; the start/end ordering is checked by the caller
    pub async fn create(&self, user_id: i64, new: &NewEvent) -> Result<Event> {
        let now = to_db(Utc::now());
        let id = {
            let conn = self.db.conn().await;
            let mut stmt = conn.prepare(
                "INSERT INTO events (user_id, title, description, location, start_time, end_time, category, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            stmt.bind((1, user_id))?;
            stmt.bind((2, new.title.as_str()))?;
            stmt.bind((3, new.description.as_deref()))?;
            stmt.bind((4, new.location.as_deref()))?;
            stmt.bind((5, to_db(new.start_time).as_str()))?;
            stmt.bind((6, to_db(new.end_time).as_str()))?;
            stmt.bind((7, new.category.as_str()))?;
            stmt.bind((8, now.as_str()))?;
            stmt.bind((9, now.as_str()))?;
            stmt.next()?;
            drop(stmt);
            last_insert_id(&conn)?
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("event {id} missing right after insert"))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Event>> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare(format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))?;
        stmt.bind((1, id))?;
        match stmt.next()? {
            State::Row => Ok(Some(read_event(&stmt)?)),
            State::Done => Ok(None),
        }
    }

    pub async fn set_external_id(&self, id: i64, external_id: &str) -> Result<bool> {
        let conn = self.db.conn().await;
        let mut stmt =
            conn.prepare("UPDATE events SET external_id = ?, updated_at = ? WHERE id = ?")?;
        stmt.bind((1, external_id))?;
        stmt.bind((2, to_db(Utc::now()).as_str()))?;
        stmt.bind((3, id))?;
        stmt.next()?;
        drop(stmt);
        Ok(changes(&conn)? > 0)
    }

    /// Events starting within `days_ahead` days of `now`, soonest first
    pub async fn list_upcoming(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        days_ahead: i64,
    ) -> Result<Vec<Event>> {
        self.list_between(user_id, now, now + Duration::days(days_ahead))
            .await
    }

    /// Events starting in `[from, to)`, soonest first
    pub async fn list_between(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare(format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE user_id = ? AND start_time >= ? AND start_time < ?
             ORDER BY start_time, id"
        ))?;
        stmt.bind((1, user_id))?;
        stmt.bind((2, to_db(from).as_str()))?;
        stmt.bind((3, to_db(to).as_str()))?;
        let mut events = Vec::new();
        while let State::Row = stmt.next()? {
            events.push(read_event(&stmt)?);
        }
        Ok(events)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare("DELETE FROM events WHERE id = ?")?;
        stmt.bind((1, id))?;
        stmt.next()?;
        drop(stmt);
        Ok(changes(&conn)? > 0)
    }
}
