//! Admin command handlers
//!
//! Handles: admin, grant_admin, user_list, broadcast, users_stats, system_info
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Role-based access from the users table
//! - 1.0.0: Extracted from the monolithic command handler

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::flows::{prompt_reply, run_broadcast, BROADCAST_PROMPT};
use crate::commands::handler::{CommandHandler, CommandRequest};
use crate::core::{chunk_for_message, Reply};
use crate::database::{Role, SystemTotals, User};
use crate::features::{Session, SystemSnapshot};

pub struct AdminHandler;

#[async_trait]
impl CommandHandler for AdminHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &[
            "admin",
            "grant_admin",
            "user_list",
            "broadcast",
            "users_stats",
            "system_info",
        ]
    }

    fn admin_only(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: Arc<CommandContext>, req: &CommandRequest) -> Result<Vec<Reply>> {
        match req.name.as_str() {
            "admin" => Ok(vec![Reply::text(ADMIN_MENU)]),
            "grant_admin" => Ok(vec![grant_admin(&ctx, req).await?]),
            "user_list" => user_list(&ctx).await,
            "broadcast" => {
                if req.args.is_empty() {
                    let session = Session::Broadcast;
                    let reply = prompt_reply(&session, BROADCAST_PROMPT);
                    ctx.sessions.begin(req.user.external_id, session);
                    Ok(vec![reply])
                } else {
                    run_broadcast(&ctx, &req.args).await
                }
            }
            "users_stats" => {
                let totals = ctx.database.statistics().system_totals().await?;
                let admins = ctx.database.users().list_admins().await?;
                let mut text = format_totals(&totals);
                text.push_str(&admin_roster(&admins));
                Ok(vec![Reply::text(text)])
            }
            "system_info" => {
                let totals = ctx.database.statistics().system_totals().await?;
                let snapshot = SystemSnapshot::gather(&ctx.database_path).await;
                let text = snapshot.format(
                    ctx.start_time.elapsed().as_secs(),
                    &totals,
                    ctx.scheduler.timer_count(),
                );
                Ok(vec![Reply::text(text)])
            }
            _ => Ok(Vec::new()),
        }
    }
}

const ADMIN_MENU: &str = "🔑 **Admin panel**\n\n\
    /grant_admin <user id> - Make a user an administrator\n\
    /user_list - All users\n\
    /broadcast - Message every user\n\
    /users_stats - Bot-wide statistics\n\
    /system_info - Host diagnostics";

async fn grant_admin(ctx: &CommandContext, req: &CommandRequest) -> Result<Reply> {
    let Some(raw) = req.first_arg() else {
        return Ok(Reply::text("Usage: /grant_admin <user id>"));
    };
    let Ok(target) = raw.parse::<u64>() else {
        return Ok(Reply::text(format!("❌ `{raw}` is not a valid user id.")));
    };

    let users = ctx.database.users();
    match users.get_by_external_id(target).await? {
        None => Ok(Reply::text(
            "❌ User not found. They need to message the bot once first.",
        )),
        Some(existing) if existing.role.is_admin() => Ok(Reply::text(format!(
            "ℹ️ {} is already an administrator.",
            existing.label()
        ))),
        Some(_) => match users.set_role(target, Role::Admin).await? {
            Some(user) => {
                info!(
                    "🔑 User {target} was made an admin by {}",
                    req.user.external_id
                );
                Ok(Reply::text(format!(
                    "✅ {} ({}) is now an administrator.",
                    user.label(),
                    user.external_id
                )))
            }
            None => Ok(Reply::text("❌ User not found.")),
        },
    }
}

async fn user_list(ctx: &CommandContext) -> Result<Vec<Reply>> {
    let users = ctx.database.users().list_all().await?;
    if users.is_empty() {
        return Ok(vec![Reply::text("📭 No users yet.")]);
    }

    let mut text = format!("👥 **Users ({})**\n\n", users.len());
    for user in &users {
        text.push_str(&user_line(user, ctx));
    }
    Ok(chunk_for_message(&text).into_iter().map(Reply::text).collect())
}

fn user_line(user: &User, ctx: &CommandContext) -> String {
    let role = match user.role {
        Role::Superadmin => "👑 superadmin",
        Role::Admin => "🔑 admin",
        Role::Regular => "👤 regular",
    };
    format!(
        "**{}**\nID: {} | @{} | {}\nJoined: {}\n\n",
        user.label(),
        user.external_id,
        user.username.as_deref().unwrap_or("n/a"),
        role,
        ctx.format_time(user.created_at)
    )
}

fn admin_roster(admins: &[User]) -> String {
    let mut text = String::from("\n\n🔑 **Administrators**\n");
    for admin in admins {
        let crown = if admin.role == Role::Superadmin { " 👑" } else { "" };
        text.push_str(&format!("• {} ({}){crown}\n", admin.label(), admin.external_id));
    }
    text
}

fn format_totals(totals: &SystemTotals) -> String {
    format!(
        "📊 **System statistics**\n\n\
         👥 Users: {}\n\
         🔑 Administrators: {}\n\n\
         📝 Tasks: {}\n\
         ✅ Completed tasks: {}\n\
         🔔 Reminders: {} ({} active, {} sent)\n\
         📅 Events: {}",
        totals.users,
        totals.admins,
        totals.tasks,
        totals.completed_tasks,
        totals.reminders,
        totals.active_reminders,
        totals.triggered_reminders,
        totals.events
    )
}
