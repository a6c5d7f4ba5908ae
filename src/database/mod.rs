//! # Persistent Store
//!
//! SQLite storage for users, tasks, reminders, events and statistics. Each
//! entity gets a typed repository borrowed from [`Database`].
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Track `triggered_at` on reminders
//! - 1.0.0: Initial schema with cascading ownership by user

pub mod events;
pub mod reminders;
pub mod statistics;
pub mod tasks;
pub mod users;

use anyhow::{Context, Result};
use log::{debug, info};
use sqlite::{Connection, State};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub use events::{Event, EventCategory, Events, NewEvent};
pub use reminders::{DueReminder, NewReminder, Reminder, Reminders};
pub use statistics::{Statistic, Statistics, SystemTotals};
pub use tasks::{NewTask, Task, TaskStatus, Tasks};
pub use users::{Role, User, Users};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id INTEGER NOT NULL UNIQUE,
        username TEXT,
        display_name TEXT,
        role TEXT NOT NULL DEFAULT 'regular',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        priority INTEGER NOT NULL DEFAULT 3,
        status TEXT NOT NULL DEFAULT 'pending',
        due_date TEXT,
        completed_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, status);

    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        scheduled_time TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        triggered_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_pending ON reminders(is_active, scheduled_time);

    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        location TEXT,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT 'personal',
        external_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_events_user_start ON events(user_id, start_time);

    CREATE TABLE IF NOT EXISTS statistics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        total_tasks INTEGER NOT NULL DEFAULT 0,
        completed_tasks INTEGER NOT NULL DEFAULT 0,
        total_reminders INTEGER NOT NULL DEFAULT 0,
        triggered_reminders INTEGER NOT NULL DEFAULT 0,
        total_events INTEGER NOT NULL DEFAULT 0,
        last_activity TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// Shared handle to the SQLite connection
///
/// Cloning is cheap; every clone serializes on the same connection.
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and run migrations
    pub async fn new(path: &str) -> Result<Self> {
        let connection = Connection::open(path)
            .with_context(|| format!("Failed to open database at {path}"))?;
        let database = Database {
            connection: Arc::new(Mutex::new(connection)),
        };
        database.init_tables().await?;
        info!("📦 Database ready at {path}");
        Ok(database)
    }

    /// Private in-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }

    async fn init_tables(&self) -> Result<()> {
        let conn = self.connection.lock().await;
        conn.execute(SCHEMA).context("Failed to apply schema")?;
        debug!("Schema applied");
        Ok(())
    }

    pub(crate) async fn conn(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().await
    }

    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }

    pub fn reminders(&self) -> Reminders<'_> {
        Reminders::new(self)
    }

    pub fn tasks(&self) -> Tasks<'_> {
        Tasks::new(self)
    }

    pub fn events(&self) -> Events<'_> {
        Events::new(self)
    }

    pub fn statistics(&self) -> Statistics<'_> {
        Statistics::new(self)
    }
}

/// Row id of the last INSERT on this connection
pub(crate) fn last_insert_id(conn: &Connection) -> Result<i64> {
    scalar(conn, "SELECT last_insert_rowid()")
}

/// Rows touched by the last INSERT/UPDATE/DELETE on this connection
pub(crate) fn changes(conn: &Connection) -> Result<i64> {
    scalar(conn, "SELECT changes()")
}

/// Run a single-value query without parameters
pub(crate) fn scalar(conn: &Connection, sql: &str) -> Result<i64> {
    let mut stmt = conn.prepare(sql)?;
    match stmt.next()? {
        State::Row => Ok(stmt.read::<i64, _>(0usize)?),
        State::Done => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_has_all_tables() {
        let db = Database::in_memory().await.unwrap();
        let conn = db.conn().await;
        for table in ["users", "tasks", "reminders", "events", "statistics"] {
            let mut stmt = conn
                .prepare("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?")
                .unwrap();
            stmt.bind((1, table)).unwrap();
            assert!(matches!(stmt.next().unwrap(), State::Row));
            assert_eq!(stmt.read::<i64, _>("n").unwrap(), 1, "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.db");
        let path = path.to_str().unwrap();

        let first = Database::new(path).await.unwrap();
        first.users().get_or_create(1, Some("ana"), None).await.unwrap();
        drop(first);

        let second = Database::new(path).await.unwrap();
        assert_eq!(second.users().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_handle_is_usable_from_spawned_tasks() {
        let db = Database::in_memory().await.unwrap();
        let mut handles = Vec::new();
        for id in 1..=4u64 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.users().get_or_create(id, None, None).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(db.users().count().await.unwrap(), 4);
    }
}
