//! Typed button custom ids
//!
//! Every button the bot renders carries one of these ids, so parsing a
//! click back is a single `ComponentAction::parse`.

use crate::database::EventCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentAction {
    TaskComplete(i64),
    TaskProgress(i64),
    TaskCancel(i64),
    TaskDelete(i64),
    TaskPage(usize),
    ReminderToggle(i64),
    ReminderDelete(i64),
    ReminderPage(usize),
    EventDelete(i64),
    /// Category answer for an in-progress event flow
    EventCategory(EventCategory),
    /// Abort whatever flow the user is in
    FlowCancel,
}

impl ComponentAction {
    pub fn custom_id(&self) -> String {
        match self {
            ComponentAction::TaskComplete(id) => format!("task_complete_{id}"),
            ComponentAction::TaskProgress(id) => format!("task_progress_{id}"),
            ComponentAction::TaskCancel(id) => format!("task_cancel_{id}"),
            ComponentAction::TaskDelete(id) => format!("task_delete_{id}"),
            ComponentAction::TaskPage(page) => format!("page_tasks_{page}"),
            ComponentAction::ReminderToggle(id) => format!("reminder_toggle_{id}"),
            ComponentAction::ReminderDelete(id) => format!("reminder_delete_{id}"),
            ComponentAction::ReminderPage(page) => format!("page_reminders_{page}"),
            ComponentAction::EventDelete(id) => format!("event_delete_{id}"),
            ComponentAction::EventCategory(category) => format!("event_type_{}", category.as_str()),
            ComponentAction::FlowCancel => "flow_cancel".to_string(),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        if custom_id == "flow_cancel" {
            return Some(ComponentAction::FlowCancel);
        }
        if let Some(raw) = custom_id.strip_prefix("event_type_") {
            return EventCategory::parse(raw).map(ComponentAction::EventCategory);
        }

        let (prefix, raw) = custom_id.rsplit_once('_')?;
        match prefix {
            "page_tasks" => raw.parse().ok().filter(|p| *p > 0).map(ComponentAction::TaskPage),
            "page_reminders" => raw
                .parse()
                .ok()
                .filter(|p| *p > 0)
                .map(ComponentAction::ReminderPage),
            _ => {
                let id: i64 = raw.parse().ok()?;
                match prefix {
                    "task_complete" => Some(ComponentAction::TaskComplete(id)),
                    "task_progress" => Some(ComponentAction::TaskProgress(id)),
                    "task_cancel" => Some(ComponentAction::TaskCancel(id)),
                    "task_delete" => Some(ComponentAction::TaskDelete(id)),
                    "reminder_toggle" => Some(ComponentAction::ReminderToggle(id)),
                    "reminder_delete" => Some(ComponentAction::ReminderDelete(id)),
                    "event_delete" => Some(ComponentAction::EventDelete(id)),
                    _ => None,
                }
            }
        }
    }
}
