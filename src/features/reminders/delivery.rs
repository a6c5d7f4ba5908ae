use anyhow::Result;
use async_trait::async_trait;
use chrono::FixedOffset;
use std::sync::Arc;

use crate::commands::components::ComponentAction;
use crate::core::time::format_local;
use crate::core::{Button, ButtonKind, Notifier, Reply};
use crate::database::DueReminder;

/// Outward notification for a reminder that came due
///
/// Registered once with the scheduler. An `Err` is logged by the caller and
/// counts as the one attempt for that firing.
#[async_trait]
pub trait ReminderDelivery: Send + Sync {
    async fn deliver(&self, due: &DueReminder) -> Result<()>;
}

/// Sends the reminder to its owner's direct messages
pub struct NotifierDelivery {
    notifier: Arc<dyn Notifier>,
    offset: FixedOffset,
}

impl NotifierDelivery {
    pub fn new(notifier: Arc<dyn Notifier>, offset: FixedOffset) -> Self {
        Self { notifier, offset }
    }
}

#[async_trait]
impl ReminderDelivery for NotifierDelivery {
    async fn deliver(&self, due: &DueReminder) -> Result<()> {
        let message = reminder_message(due, self.offset);
        self.notifier.send(due.owner.external_id, &message).await
    }
}

pub fn reminder_message(due: &DueReminder, offset: FixedOffset) -> Reply {
    let reminder = &due.reminder;
    let mut text = format!("🔔 **Reminder:** {}\n", reminder.title);
    if let Some(description) = &reminder.description {
        text.push_str(&format!("📝 {description}\n"));
    }
    text.push_str(&format!(
        "🕐 {}",
        format_local(reminder.scheduled_time, offset)
    ));

    Reply::text(text).with_row(vec![
        Button::new(
            ComponentAction::ReminderDelete(reminder.id).custom_id(),
            "🗑️ Delete",
            ButtonKind::Danger,
        ),
        Button::new(
            ComponentAction::ReminderPage(1).custom_id(),
            "📋 My reminders",
            ButtonKind::Secondary,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Reminder, Role, User};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<(u64, Reply)>>,
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn send(&self, external_id: u64, reply: &Reply) -> Result<()> {
            self.sent.lock().unwrap().push((external_id, reply.clone()));
            Ok(())
        }
    }

    fn due() -> DueReminder {
        let at = Utc.with_ymd_and_hms(2025, 12, 1, 6, 0, 0).unwrap();
        DueReminder {
            reminder: Reminder {
                id: 9,
                user_id: 1,
                title: "Submit report".to_string(),
                description: Some("Chapter 2 draft".to_string()),
                scheduled_time: at,
                is_active: true,
                triggered_at: None,
                created_at: at,
                updated_at: at,
            },
            owner: User {
                id: 1,
                external_id: 4242,
                username: Some("ana".to_string()),
                display_name: None,
                role: Role::Regular,
                created_at: at,
                updated_at: at,
            },
        }
    }

    #[tokio::test]
    async fn test_delivers_to_owner_in_local_time() {
        let notifier = Arc::new(CapturingNotifier::default());
        let delivery = NotifierDelivery::new(notifier.clone(), FixedOffset::east_opt(3 * 3600).unwrap());

        delivery.deliver(&due()).await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, reply) = &sent[0];
        assert_eq!(*to, 4242);
        assert!(reply.text.contains("Submit report"));
        assert!(reply.text.contains("Chapter 2 draft"));
        assert!(reply.text.contains("01.12.2025 09:00"));
        assert!(reply.button_ids().any(|id| id == "reminder_delete_9"));
    }
}
