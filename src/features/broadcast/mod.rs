//! # Feature: Broadcast
//!
//! Admin announcements delivered to every registered user by direct message.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Sequential delivery with per-user failure accounting

use std::sync::Arc;

use log::{info, warn};

use crate::core::{Notifier, Reply};
use crate::database::User;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn summary(&self) -> String {
        format!(
            "📢 Broadcast finished: {} of {} delivered, {} failed.",
            self.delivered, self.attempted, self.failed
        )
    }
}

#[derive(Clone)]
pub struct Broadcaster {
    notifier: Arc<dyn Notifier>,
}

impl Broadcaster {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Send `text` to each user in turn. A failed send is logged and skipped.
    pub async fn broadcast(&self, users: &[User], text: &str) -> BroadcastReport {
        let message = Reply::text(format!("📢 **Announcement**\n\n{text}"));
        let mut report = BroadcastReport {
            attempted: users.len(),
            ..Default::default()
        };

        for user in users {
            match self.notifier.send(user.external_id, &message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Broadcast to {} failed: {e:#}", user.external_id);
                    report.failed += 1;
                }
            }
        }

        info!(
            "📢 Broadcast sent to {}/{} users",
            report.delivered, report.attempted
        );
        report
    }
}
