use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlite::{State, Statement};

use super::{changes, last_insert_id, Database};
use crate::core::time::{from_db, to_db};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Regular,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "regular",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "regular" => Some(Role::Regular),
            "admin" => Some(Role::Admin),
            "superadmin" => Some(Role::Superadmin),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    /// Discord user id
    pub external_id: u64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Best human-readable name for listings
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| format!("user {}", self.external_id))
    }
}

const USER_COLUMNS: &str = "id, external_id, username, display_name, role, created_at, updated_at";

fn read_user(stmt: &Statement) -> Result<User> {
    let role_raw = stmt.read::<String, _>("role")?;
    Ok(User {
        id: stmt.read::<i64, _>("id")?,
        external_id: stmt.read::<i64, _>("external_id")? as u64,
        username: stmt.read::<Option<String>, _>("username")?,
        display_name: stmt.read::<Option<String>, _>("display_name")?,
        role: Role::parse(&role_raw).ok_or_else(|| anyhow!("unknown role '{role_raw}'"))?,
        created_at: from_db(&stmt.read::<String, _>("created_at")?)?,
        updated_at: from_db(&stmt.read::<String, _>("updated_at")?)?,
    })
}

pub struct Users<'a> {
    db: &'a Database,
}

impl<'a> Users<'a> {
    pub(super) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Find the user for a chat id, creating it on first contact
    ///
    /// A changed username or display name is written back.
    pub async fn get_or_create(
        &self,
        external_id: u64,
        username: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<User> {
        if let Some(existing) = self.get_by_external_id(external_id).await? {
            let profile_changed = (username.is_some() && existing.username.as_deref() != username)
                || (display_name.is_some() && existing.display_name.as_deref() != display_name);
            if !profile_changed {
                return Ok(existing);
            }
            return self
                .update_profile(external_id, username, display_name)
                .await?
                .ok_or_else(|| anyhow!("user {external_id} disappeared during profile update"));
        }

        let now = to_db(Utc::now());
        let id = {
            let conn = self.db.conn().await;
            let mut stmt = conn.prepare(
                "INSERT INTO users (external_id, username, display_name, role, created_at, updated_at)
                 VALUES (?, ?, ?, 'regular', ?, ?)",
            )?;
            stmt.bind((1, external_id as i64))?;
            stmt.bind((2, username))?;
            stmt.bind((3, display_name))?;
            stmt.bind((4, now.as_str()))?;
            stmt.bind((5, now.as_str()))?;
            stmt.next()?;
            drop(stmt);
            last_insert_id(&conn)?
        };
        log::info!("👤 Registered new user {external_id} (id {id})");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("user {id} missing right after insert"))
    }

    pub async fn get_by_external_id(&self, external_id: u64) -> Result<Option<User>> {
        let conn = self.db.conn().await;
        let mut stmt =
            conn.prepare(format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = ?"))?;
        stmt.bind((1, external_id as i64))?;
        match stmt.next()? {
            State::Row => Ok(Some(read_user(&stmt)?)),
            State::Done => Ok(None),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare(format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))?;
        stmt.bind((1, id))?;
        match stmt.next()? {
            State::Row => Ok(Some(read_user(&stmt)?)),
            State::Done => Ok(None),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare(format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
        let mut users = Vec::new();
        while let State::Row = stmt.next()? {
            users.push(read_user(&stmt)?);
        }
        Ok(users)
    }

    pub async fn list_admins(&self) -> Result<Vec<User>> {
        let conn = self.db.conn().await;
        let mut stmt = conn.prepare(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role IN ('admin', 'superadmin') ORDER BY id"
        ))?;
        let mut users = Vec::new();
        while let State::Row = stmt.next()? {
            users.push(read_user(&stmt)?);
        }
        Ok(users)
    }

    /// Change a user's role; `None` when the user has never contacted the bot
    pub async fn set_role(&self, external_id: u64, role: Role) -> Result<Option<User>> {
        let touched = {
            let conn = self.db.conn().await;
            let mut stmt =
                conn.prepare("UPDATE users SET role = ?, updated_at = ? WHERE external_id = ?")?;
            stmt.bind((1, role.as_str()))?;
            stmt.bind((2, to_db(Utc::now()).as_str()))?;
            stmt.bind((3, external_id as i64))?;
            stmt.next()?;
            drop(stmt);
            changes(&conn)?
        };
        if touched == 0 {
            return Ok(None);
        }
        self.get_by_external_id(external_id).await
    }

    pub async fn update_profile(
        &self,
        external_id: u64,
        username: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<Option<User>> {
        {
            let conn = self.db.conn().await;
            let mut stmt = conn.prepare(
                "UPDATE users
                 SET username = COALESCE(?, username),
                     display_name = COALESCE(?, display_name),
                     updated_at = ?
                 WHERE external_id = ?",
            )?;
            stmt.bind((1, username))?;
            stmt.bind((2, display_name))?;
            stmt.bind((3, to_db(Utc::now()).as_str()))?;
            stmt.bind((4, external_id as i64))?;
            stmt.next()?;
        }
        self.get_by_external_id(external_id).await
    }

    pub async fn count(&self) -> Result<i64> {
        let conn = self.db.conn().await;
        super::scalar(&conn, "SELECT COUNT(*) FROM users")
    }
}
