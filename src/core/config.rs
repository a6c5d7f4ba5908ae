//! Environment-driven configuration
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.0.0: Discord credentials, owner id, storage path and timezone offset

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use std::env;

pub const DEFAULT_DATABASE_PATH: &str = "student_tracker.db";
pub const DEFAULT_TIMEZONE_OFFSET: &str = "+03:00";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_guild_id: Option<String>,
    /// Discord user id of the bot owner, promoted to superadmin at startup
    pub admin_id: u64,
    pub database_path: String,
    pub log_level: String,
    pub debug: bool,
    /// Offset used to interpret and display every date a user types or reads
    pub timezone_offset: FixedOffset,
    pub calendar_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process env in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let discord_token = non_empty("DISCORD_TOKEN")
            .ok_or_else(|| anyhow!("DISCORD_TOKEN environment variable not set"))?;

        let admin_id = non_empty("ADMIN_ID")
            .ok_or_else(|| anyhow!("ADMIN_ID environment variable not set"))?
            .parse::<u64>()
            .context("ADMIN_ID must be a numeric Discord user id")?;

        let debug = non_empty("DEBUG")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let log_level = non_empty("LOG_LEVEL")
            .unwrap_or_else(|| if debug { "debug" } else { "info" }.to_string());

        let offset_raw =
            non_empty("TIMEZONE_OFFSET").unwrap_or_else(|| DEFAULT_TIMEZONE_OFFSET.to_string());
        let timezone_offset = parse_offset(&offset_raw)
            .ok_or_else(|| anyhow!("TIMEZONE_OFFSET must look like +03:00, got '{offset_raw}'"))?;

        let config = Config {
            discord_token,
            discord_guild_id: non_empty("DISCORD_GUILD_ID"),
            admin_id,
            database_path: non_empty("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            log_level,
            debug,
            timezone_offset,
            calendar_webhook_url: non_empty("CALENDAR_WEBHOOK_URL"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.discord_token.is_empty() {
            return Err(anyhow!("DISCORD_TOKEN must not be empty"));
        }
        if self.admin_id == 0 {
            return Err(anyhow!("ADMIN_ID must be a non-zero Discord user id"));
        }
        if let Some(url) = &self.calendar_webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow!("CALENDAR_WEBHOOK_URL must be an http(s) URL"));
            }
        }
        Ok(())
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HH` or `Z` into a fixed offset
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (rest.parse::<i32>().ok()?, 0),
    };
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
