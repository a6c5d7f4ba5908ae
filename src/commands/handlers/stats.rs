//! Personal statistics
//!
//! Handles: stats

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::{CommandHandler, CommandRequest};
use crate::core::Reply;
use crate::database::{Statistic, TaskStatus};

pub struct StatsHandler;

#[async_trait]
impl CommandHandler for StatsHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["stats"]
    }

    async fn handle(&self, ctx: Arc<CommandContext>, req: &CommandRequest) -> Result<Vec<Reply>> {
        let user = &req.user;
        let stat = ctx.database.statistics().refresh(user.id, ctx.now()).await?;
        let in_progress = ctx
            .database
            .tasks()
            .count_by_status(user.id, TaskStatus::InProgress)
            .await?;

        let last_activity = stat
            .last_activity
            .map(|at| ctx.format_time(at))
            .unwrap_or_else(|| "never".to_string());
        Ok(vec![Reply::text(format_stats(
            &user.label(),
            &stat,
            in_progress,
            &last_activity,
        ))])
    }
}

fn format_stats(name: &str, stat: &Statistic, in_progress: i64, last_activity: &str) -> String {
    let mut text = format!("📊 **Your statistics**\n\n👤 **User:** {name}\n\n");
    text.push_str(&format!(
        "📝 **Tasks:**\n  • Total: {}\n  • ✅ Completed: {}\n  • 🔄 In progress: {}\n  • 📋 Remaining: {}\n\n",
        stat.total_tasks,
        stat.completed_tasks,
        in_progress,
        stat.total_tasks - stat.completed_tasks
    ));
    text.push_str(&format!(
        "🔔 **Reminders:**\n  • Total: {}\n  • 📨 Sent: {}\n\n",
        stat.total_reminders, stat.triggered_reminders
    ));
    text.push_str(&format!("📅 **Events:**\n  • Total: {}\n\n", stat.total_events));
    text.push_str(&format!("🕐 **Last activity:** {last_activity}\n"));
    if stat.total_tasks > 0 {
        text.push_str(&format!(
            "\n📈 **Completion rate:** {:.1}%\n",
            stat.completion_rate()
        ));
    }
    text
}
