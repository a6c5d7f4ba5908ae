use super::{
    is_cancel, is_skip, optional_text, validate_title, FlowContext, Transition, DATE_HINT,
    SKIP_HINT,
};
use crate::core::time::parse_local;
use crate::core::ValidationError;
use crate::database::tasks::DEFAULT_PRIORITY;
use crate::database::NewTask;

/// title → description → priority → due date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFlow {
    Title,
    Description {
        title: String,
    },
    Priority {
        title: String,
        description: Option<String>,
    },
    DueDate {
        title: String,
        description: Option<String>,
        priority: u8,
    },
}

pub fn parse_priority(input: &str) -> Result<u8, ValidationError> {
    if is_skip(input) {
        return Ok(DEFAULT_PRIORITY);
    }
    match input.trim().to_lowercase().as_str() {
        "1" | "high" | "🔴" => Ok(1),
        "2" | "medium" | "🟡" => Ok(2),
        "3" | "low" | "🟢" => Ok(3),
        _ => Err(ValidationError::InvalidPriority),
    }
}

pub fn priority_emoji(priority: u8) -> &'static str {
    match priority {
        1 => "🔴",
        2 => "🟡",
        _ => "🟢",
    }
}

impl TaskFlow {
    pub fn start() -> (Self, String) {
        let state = TaskFlow::Title;
        let prompt = state.prompt();
        (state, prompt)
    }

    pub fn prompt(&self) -> String {
        match self {
            TaskFlow::Title => "📝 **New task**\nWhat is the task called?".to_string(),
            TaskFlow::Description { .. } => format!("Add a description. {SKIP_HINT}"),
            TaskFlow::Priority { .. } => {
                "Choose a priority: `1` 🔴 high, `2` 🟡 medium, `3` 🟢 low (`skip` = low)"
                    .to_string()
            }
            TaskFlow::DueDate { .. } => format!("When is it due? {DATE_HINT}. {SKIP_HINT}"),
        }
    }

    pub fn advance(self, input: &str, ctx: &FlowContext) -> Transition<Self, NewTask> {
        if is_cancel(input) {
            return Transition::Cancelled;
        }

        match self {
            TaskFlow::Title => match validate_title(input) {
                Ok(title) => continue_with(TaskFlow::Description { title }),
                Err(error) => Transition::Invalid {
                    state: TaskFlow::Title,
                    error,
                },
            },
            TaskFlow::Description { title } => continue_with(TaskFlow::Priority {
                title,
                description: optional_text(input),
            }),
            TaskFlow::Priority { title, description } => match parse_priority(input) {
                Ok(priority) => continue_with(TaskFlow::DueDate {
                    title,
                    description,
                    priority,
                }),
                Err(error) => Transition::Invalid {
                    state: TaskFlow::Priority { title, description },
                    error,
                },
            },
            TaskFlow::DueDate {
                title,
                description,
                priority,
            } => {
                let due_date = if is_skip(input) {
                    None
                } else {
                    match parse_local(input, ctx.offset) {
                        Ok(due) => Some(due),
                        Err(error) => {
                            return Transition::Invalid {
                                state: TaskFlow::DueDate {
                                    title,
                                    description,
                                    priority,
                                },
                                error,
                            }
                        }
                    }
                };
                Transition::Complete(NewTask {
                    title,
                    description,
                    priority,
                    due_date,
                })
            }
        }
    }
}

fn continue_with(state: TaskFlow) -> Transition<TaskFlow, NewTask> {
    let prompt = state.prompt();
    Transition::Continue { state, prompt }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn ctx() -> FlowContext {
        FlowContext {
            now: Utc.with_ymd_and_hms(2025, 11, 30, 9, 0, 0).unwrap(),
            offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        }
    }

    fn step(state: TaskFlow, input: &str) -> TaskFlow {
        match state.advance(input, &ctx()) {
            Transition::Continue { state, .. } => state,
            other => panic!("expected Continue, got {other:?}"),
        }
    }

    #[test]
    fn test_full_flow_with_skips() {
        let (state, _) = TaskFlow::start();
        let state = step(state, "Read chapter 3");
        let state = step(state, "skip");
        let state = step(state, "skip");
        assert_eq!(
            state,
            TaskFlow::DueDate {
                title: "Read chapter 3".to_string(),
                description: None,
                priority: 3,
            }
        );

        match state.advance("/skip", &ctx()) {
            Transition::Complete(task) => {
                assert_eq!(task.priority, 3);
                assert!(task.due_date.is_none());
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_due_date_parsed_in_local_time() {
        let state = TaskFlow::DueDate {
            title: "Essay".to_string(),
            description: Some("2000 words".to_string()),
            priority: 1,
        };
        match state.advance("05.12.2025 18:00", &ctx()) {
            Transition::Complete(task) => assert_eq!(
                task.due_date,
                Some(Utc.with_ymd_and_hms(2025, 12, 5, 15, 0, 0).unwrap())
            ),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_priority_reprompts_same_step() {
        let state = TaskFlow::Priority {
            title: "t".to_string(),
            description: None,
        };
        match state.clone().advance("urgent!!", &ctx()) {
            Transition::Invalid { state: same, error } => {
                assert_eq!(same, state);
                assert_eq!(error, ValidationError::InvalidPriority);
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert_eq!(
            step(state, "high"),
            TaskFlow::DueDate {
                title: "t".to_string(),
                description: None,
                priority: 1
            }
        );
    }

    #[test]
    fn test_empty_title_and_cancel() {
        assert!(matches!(
            TaskFlow::Title.advance("   ", &ctx()),
            Transition::Invalid {
                error: ValidationError::EmptyTitle,
                ..
            }
        ));
        assert_eq!(
            TaskFlow::Description {
                title: "t".to_string()
            }
            .advance("cancel", &ctx()),
            Transition::Cancelled
        );
    }
}
