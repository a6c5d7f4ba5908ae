use super::{is_cancel, optional_text, validate_title, FlowContext, Transition, DATE_HINT, SKIP_HINT};
use crate::core::time::parse_local;
use crate::core::ValidationError;
use crate::database::NewReminder;

/// title → description → time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderFlow {
    Title,
    Description {
        title: String,
    },
    Time {
        title: String,
        description: Option<String>,
    },
}

impl ReminderFlow {
    pub fn start() -> (Self, String) {
        let state = ReminderFlow::Title;
        let prompt = state.prompt();
        (state, prompt)
    }

    pub fn prompt(&self) -> String {
        match self {
            ReminderFlow::Title => "⏰ **New reminder**\nWhat should I remind you about?".to_string(),
            ReminderFlow::Description { .. } => format!("Add a description. {SKIP_HINT}"),
            ReminderFlow::Time { .. } => format!("When should I remind you? {DATE_HINT}"),
        }
    }

    pub fn advance(self, input: &str, ctx: &FlowContext) -> Transition<Self, NewReminder> {
        if is_cancel(input) {
            return Transition::Cancelled;
        }

        match self {
            ReminderFlow::Title => match validate_title(input) {
                Ok(title) => continue_with(ReminderFlow::Description { title }),
                Err(error) => Transition::Invalid {
                    state: ReminderFlow::Title,
                    error,
                },
            },
            ReminderFlow::Description { title } => continue_with(ReminderFlow::Time {
                title,
                description: optional_text(input),
            }),
            ReminderFlow::Time { title, description } => {
                let checked = parse_local(input, ctx.offset).and_then(|at| {
                    if at <= ctx.now {
                        Err(ValidationError::TimeInPast)
                    } else {
                        Ok(at)
                    }
                });
                match checked {
                    Ok(scheduled_time) => Transition::Complete(NewReminder {
                        title,
                        description,
                        scheduled_time,
                    }),
                    Err(error) => Transition::Invalid {
                        state: ReminderFlow::Time { title, description },
                        error,
                    },
                }
            }
        }
    }
}

fn continue_with(state: ReminderFlow) -> Transition<ReminderFlow, NewReminder> {
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
            offset: FixedOffset::east_opt(0).unwrap(),
        }
    }

    fn time_step() -> ReminderFlow {
        ReminderFlow::Time {
            title: "Submit report".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_walks_title_description_time() {
        let (state, prompt) = ReminderFlow::start();
        assert!(prompt.contains("New reminder"));

        let state = match state.advance("Submit report", &ctx()) {
            Transition::Continue { state, .. } => state,
            other => panic!("unexpected {other:?}"),
        };
        let state = match state.advance("skip", &ctx()) {
            Transition::Continue { state, prompt } => {
                assert!(prompt.contains("DD.MM.YYYY"));
                state
            }
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(state, time_step());

        match state.advance("01.12.2025 09:00", &ctx()) {
            Transition::Complete(new) => {
                assert_eq!(new.title, "Submit report");
                assert_eq!(
                    new.scheduled_time,
                    Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap()
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rejects_past_and_malformed_times() {
        assert_eq!(
            time_step().advance("30.11.2025 08:59", &ctx()),
            Transition::Invalid {
                state: time_step(),
                error: ValidationError::TimeInPast
            }
        );
        assert_eq!(
            time_step().advance("30.11.2025 09:00", &ctx()),
            Transition::Invalid {
                state: time_step(),
                error: ValidationError::TimeInPast
            }
        );
        assert_eq!(
            time_step().advance("next friday", &ctx()),
            Transition::Invalid {
                state: time_step(),
                error: ValidationError::InvalidDateTime
            }
        );
    }

    #[test]
    fn test_cancel_from_any_step() {
        assert_eq!(ReminderFlow::Title.advance("cancel", &ctx()), Transition::Cancelled);
        assert_eq!(time_step().advance("/cancel", &ctx()), Transition::Cancelled);
    }
}
