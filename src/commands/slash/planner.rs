//! Task, reminder, calendar and general slash commands

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        simple("start", "Open the main menu"),
        simple("help", "Show every command"),
        simple("cancel", "Abort the current step-by-step entry"),
        simple("add_task", "Create a task step by step"),
        paged("my_tasks", "Browse your tasks"),
        simple("add_reminder", "Set a reminder step by step"),
        paged("my_reminders", "Browse your reminders"),
        simple("add_event", "Add an event to your calendar"),
        simple("calendar", "Events for the next 7 days"),
        simple("today_events", "Today's events"),
        simple("stats", "Your personal statistics"),
    ]
}

pub(super) fn simple(name: &str, description: &str) -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(name)
        .description(description)
        .to_owned()
}

/// Listing commands take an optional page number
fn paged(name: &str, description: &str) -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(name)
        .description(description)
        .create_option(|option| {
            option
                .name("page")
                .description("Page to open")
                .kind(CommandOptionType::Integer)
                .required(false)
                .min_int_value(1)
        })
        .to_owned()
}
