//! Date parsing and formatting
//!
//! Instants are stored as UTC text; users type and read dates in the
//! process-wide offset from [`Config::timezone_offset`](crate::core::Config).

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};

use super::error::ValidationError;

/// Storage format, lexicographically ordered
pub const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// What users type and read
pub const INPUT_FORMAT: &str = "%d.%m.%Y %H:%M";

pub fn to_db(instant: DateTime<Utc>) -> String {
    instant.format(DB_FORMAT).to_string()
}

pub fn from_db(raw: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, DB_FORMAT)
        .with_context(|| format!("invalid stored timestamp '{raw}'"))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

pub fn from_db_opt(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(from_db).transpose()
}

/// Parse `DD.MM.YYYY HH:MM` typed in `offset` local time
pub fn parse_local(input: &str, offset: FixedOffset) -> Result<DateTime<Utc>, ValidationError> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), INPUT_FORMAT)
        .map_err(|_| ValidationError::InvalidDateTime)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or(ValidationError::InvalidDateTime)
}

pub fn format_local(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant.with_timezone(&offset).format(INPUT_FORMAT).to_string()
}

/// UTC bounds `[start, end)` of the local calendar day containing `now`
pub fn local_day_bounds(now: DateTime<Utc>, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now
        .with_timezone(&offset)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| offset.from_local_datetime(&midnight).single())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);
    (start, start + Duration::days(1))
}
