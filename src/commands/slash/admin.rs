//! Admin slash commands: /admin, /grant_admin, /user_list, /broadcast, /users_stats, /system_info
//!
//! Access is checked against the user's role when the command runs, so
//! these are visible to everyone.

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

use super::planner::simple;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        simple("admin", "Admin panel (Admin)"),
        create_grant_admin_command(),
        simple("user_list", "List every user (Admin)"),
        create_broadcast_command(),
        simple("users_stats", "Bot-wide statistics (Admin)"),
        simple("system_info", "Host diagnostics (Admin)"),
    ]
}

fn create_grant_admin_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("grant_admin")
        .description("Make a user an administrator (Admin)")
        .create_option(|option| {
            option
                .name("user_id")
                .description("Numeric id of the user")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .to_owned()
}

/// Without a message the bot asks for one
fn create_broadcast_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("broadcast")
        .description("Send a message to every user (Admin)")
        .create_option(|option| {
            option
                .name("message")
                .description("Text to deliver")
                .kind(CommandOptionType::String)
                .required(false)
        })
        .to_owned()
}
