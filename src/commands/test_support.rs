use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use super::context::CommandContext;
use super::dispatcher::{Actor, Dispatcher, Input};
use crate::core::{ManualClock, Notifier, Reply};
use crate::database::{Database, DueReminder, Role};
use crate::features::{Broadcaster, NoopCalendar, ReminderDelivery, ReminderScheduler};

/// Remembers every outgoing message
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(u64, Reply)>>,
    pub unreachable: Vec<u64>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, external_id: u64, reply: &Reply) -> Result<()> {
        if self.unreachable.contains(&external_id) {
            return Err(anyhow!("cannot DM {external_id}"));
        }
        self.sent.lock().unwrap().push((external_id, reply.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDelivery {
    pub delivered: Mutex<Vec<i64>>,
}

#[async_trait]
impl ReminderDelivery for RecordingDelivery {
    async fn deliver(&self, due: &DueReminder) -> Result<()> {
        self.delivered.lock().unwrap().push(due.reminder.id);
        Ok(())
    }
}

pub struct Harness {
    pub dispatcher: Dispatcher,
    pub ctx: Arc<CommandContext>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub delivery: Arc<RecordingDelivery>,
}

pub const ADMIN: u64 = 1000;

pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 30, 9, 0, 0).unwrap()
}

pub async fn harness() -> Harness {
    let database = Database::in_memory().await.unwrap();
    database.users().get_or_create(ADMIN, Some("root"), None).await.unwrap();
    database.users().set_role(ADMIN, Role::Superadmin).await.unwrap();

    let clock = Arc::new(ManualClock::new(test_now()));
    let scheduler = ReminderScheduler::new(database.clone(), clock.clone());
    let delivery = Arc::new(RecordingDelivery::default());
    scheduler.set_delivery(delivery.clone()).unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = Arc::new(CommandContext::new(
        database,
        scheduler,
        Broadcaster::new(notifier.clone()),
        Arc::new(NoopCalendar),
        clock.clone(),
        FixedOffset::east_opt(0).unwrap(),
        ":memory:",
    ));
    Harness {
        dispatcher: Dispatcher::new(ctx.clone()),
        ctx,
        clock,
        notifier,
        delivery,
    }
}

impl Harness {
    pub async fn command(&self, user: u64, name: &str, args: &str) -> Vec<Reply> {
        self.dispatcher
            .dispatch(
                &Actor::new(user),
                Input::Command {
                    name: name.to_string(),
                    args: args.to_string(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn text(&self, user: u64, text: &str) -> Vec<Reply> {
        self.dispatcher
            .dispatch(&Actor::new(user), Input::Text(text.to_string()))
            .await
            .unwrap()
    }

    pub async fn button(&self, user: u64, custom_id: &str) -> Vec<Reply> {
        self.dispatcher
            .dispatch(&Actor::new(user), Input::Button(custom_id.to_string()))
            .await
            .unwrap()
    }

    /// Feed several lines into the user's current flow, returning the last replies
    pub async fn answer_all(&self, user: u64, lines: &[&str]) -> Vec<Reply> {
        let mut last = Vec::new();
        for line in lines {
            last = self.text(user, line).await;
        }
        last
    }
}
