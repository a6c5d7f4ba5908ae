//! # Feature: Calendar Sync
//!
//! Mirrors locally created events into an external calendar. The local
//! store is always the source of truth; sync failures are logged and never
//! undo a local change.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true (`CALENDAR_WEBHOOK_URL`)
//!
//! ## Changelog
//! - 1.1.0: Webhook-backed calendar
//! - 1.0.0: Collaborator trait with no-op default

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::database::Event;

/// Payload sent to the external calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCalendarEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category: &'static str,
    /// Owner's chat id, for calendars shared between users
    pub owner: u64,
}

impl NewCalendarEvent {
    pub fn from_event(event: &Event, owner: u64) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start_time: event.start_time,
            end_time: event.end_time,
            category: event.category.as_str(),
            owner,
        }
    }
}

/// External calendar collaborator
#[async_trait]
pub trait CalendarSync: Send + Sync {
    /// Create the event remotely, returning its remote id if the calendar assigns one
    async fn create_event(&self, event: &NewCalendarEvent) -> Result<Option<String>>;

    async fn delete_event(&self, external_id: &str) -> Result<()>;
}

/// Used when no calendar is configured
pub struct NoopCalendar;

#[async_trait]
impl CalendarSync for NoopCalendar {
    async fn create_event(&self, _event: &NewCalendarEvent) -> Result<Option<String>> {
        Ok(None)
    }

    async fn delete_event(&self, _external_id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

/// Posts events as JSON to a webhook endpoint
///
/// `POST {url}` with the event body, expecting `{"id": "..."}` back.
/// `DELETE {url}/{id}` removes it.
pub struct WebhookCalendar {
    client: reqwest::Client,
    url: String,
}

impl WebhookCalendar {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("student-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build calendar HTTP client")?;
        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
        })
    }

    fn event_url(&self, external_id: &str) -> String {
        format!("{}/{}", self.url, external_id)
    }
}

#[async_trait]
impl CalendarSync for WebhookCalendar {
    async fn create_event(&self, event: &NewCalendarEvent) -> Result<Option<String>> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .context("Calendar request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Calendar returned HTTP {status}"));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let created: CreatedEvent =
            serde_json::from_str(&body).context("Calendar response is not {\"id\": ...}")?;
        debug!("Calendar created event {}", created.id);
        Ok(Some(created.id))
    }

    async fn delete_event(&self, external_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.event_url(external_id))
            .send()
            .await
            .context("Calendar request failed")?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(anyhow!("Calendar returned HTTP {status}"))
        }
    }
}
