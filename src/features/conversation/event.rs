use chrono::{DateTime, Utc};

use super::{is_cancel, optional_text, validate_title, FlowContext, Transition, DATE_HINT, SKIP_HINT};
use crate::core::time::parse_local;
use crate::core::ValidationError;
use crate::database::{EventCategory, NewEvent};

/// title → start → end → description → location → category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFlow {
    Title,
    Start {
        title: String,
    },
    End {
        title: String,
        start: DateTime<Utc>,
    },
    Description {
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Location {
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        description: Option<String>,
    },
    Category {
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        description: Option<String>,
        location: Option<String>,
    },
}

impl EventFlow {
    pub fn start() -> (Self, String) {
        let state = EventFlow::Title;
        let prompt = state.prompt();
        (state, prompt)
    }

    pub fn prompt(&self) -> String {
        match self {
            EventFlow::Title => "📅 **New event**\nWhat is the event called?".to_string(),
            EventFlow::Start { .. } => format!("When does it start? {DATE_HINT}"),
            EventFlow::End { .. } => format!("When does it end? {DATE_HINT}"),
            EventFlow::Description { .. } => format!("Add a description. {SKIP_HINT}"),
            EventFlow::Location { .. } => format!("Where is it? {SKIP_HINT}"),
            EventFlow::Category { .. } => {
                "What kind of event is it? `institutional`, `personal` or `exam`".to_string()
            }
        }
    }

    /// Category step, answered with buttons in the chat
    pub fn awaiting_category(&self) -> bool {
        matches!(self, EventFlow::Category { .. })
    }

    pub fn advance(self, input: &str, ctx: &FlowContext) -> Transition<Self, NewEvent> {
        if is_cancel(input) {
            return Transition::Cancelled;
        }

        match self {
            EventFlow::Title => match validate_title(input) {
                Ok(title) => continue_with(EventFlow::Start { title }),
                Err(error) => Transition::Invalid {
                    state: EventFlow::Title,
                    error,
                },
            },
            EventFlow::Start { title } => match parse_local(input, ctx.offset) {
                Ok(start) => continue_with(EventFlow::End { title, start }),
                Err(error) => Transition::Invalid {
                    state: EventFlow::Start { title },
                    error,
                },
            },
            EventFlow::End { title, start } => {
                let checked = parse_local(input, ctx.offset).and_then(|end| {
                    if end <= start {
                        Err(ValidationError::EndBeforeStart)
                    } else {
                        Ok(end)
                    }
                });
                match checked {
                    Ok(end) => continue_with(EventFlow::Description { title, start, end }),
                    Err(error) => Transition::Invalid {
                        state: EventFlow::End { title, start },
                        error,
                    },
                }
            }
            EventFlow::Description { title, start, end } => continue_with(EventFlow::Location {
                title,
                start,
                end,
                description: optional_text(input),
            }),
            EventFlow::Location {
                title,
                start,
                end,
                description,
            } => continue_with(EventFlow::Category {
                title,
                start,
                end,
                description,
                location: optional_text(input),
            }),
            EventFlow::Category {
                title,
                start,
                end,
                description,
                location,
            } => match EventCategory::parse(input) {
                Some(category) => Transition::Complete(NewEvent {
                    title,
                    description,
                    location,
                    start_time: start,
                    end_time: end,
                    category,
                }),
                None => Transition::Invalid {
                    state: EventFlow::Category {
                        title,
                        start,
                        end,
                        description,
                        location,
                    },
                    error: ValidationError::UnknownCategory,
                },
            },
        }
    }
}

fn continue_with(state: EventFlow) -> Transition<EventFlow, NewEvent> {
    let prompt = state.prompt();
    Transition::Continue { state, prompt }
}
