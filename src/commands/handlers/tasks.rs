//! Task command handlers
//!
//! Handles: add_task, my_tasks, task buttons
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::FixedOffset;
use log::info;
use std::sync::Arc;

use super::{not_found, page_arg, paginate, pagination_row};
use crate::commands::components::ComponentAction;
use crate::commands::context::CommandContext;
use crate::commands::flows::prompt_reply;
use crate::commands::handler::{CommandHandler, CommandRequest};
use crate::core::time::format_local;
use crate::core::{Button, ButtonKind, Reply};
use crate::database::{Task, TaskStatus, User};
use crate::features::conversation::task::priority_emoji;
use crate::features::{Session, TaskFlow};

pub struct TasksHandler;

#[async_trait]
impl CommandHandler for TasksHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["add_task", "my_tasks"]
    }

    async fn handle(&self, ctx: Arc<CommandContext>, req: &CommandRequest) -> Result<Vec<Reply>> {
        match req.name.as_str() {
            "add_task" => {
                let (flow, prompt) = TaskFlow::start();
                let session = Session::Task(flow);
                let reply = prompt_reply(&session, prompt);
                ctx.sessions.begin(req.user.external_id, session);
                Ok(vec![reply])
            }
            "my_tasks" => {
                let page = page_arg(req.first_arg());
                Ok(vec![list_page(&ctx, &req.user, page).await?])
            }
            _ => Ok(Vec::new()),
        }
    }
}

pub(crate) fn task_card(task: &Task, offset: FixedOffset) -> String {
    let mut card = format!(
        "{} **{}** `#{}`\n",
        priority_emoji(task.priority),
        task.title,
        task.id
    );
    if let Some(description) = &task.description {
        card.push_str(&format!("📝 {description}\n"));
    }
    card.push_str(&format!("{} {}\n", task.status.emoji(), task.status.label()));
    if let Some(due) = task.due_date {
        card.push_str(&format!("📅 Due: {}\n", format_local(due, offset)));
    }
    card
}

pub(crate) fn task_buttons(task: &Task) -> Vec<Button> {
    let id = task.id;
    vec![
        Button::new(
            ComponentAction::TaskComplete(id).custom_id(),
            format!("✅ #{id}"),
            ButtonKind::Success,
        )
        .disabled(task.status == TaskStatus::Completed),
        Button::new(
            ComponentAction::TaskProgress(id).custom_id(),
            format!("🔄 #{id}"),
            ButtonKind::Primary,
        )
        .disabled(task.status == TaskStatus::InProgress),
        Button::new(
            ComponentAction::TaskCancel(id).custom_id(),
            format!("🚫 #{id}"),
            ButtonKind::Secondary,
        )
        .disabled(task.status == TaskStatus::Cancelled),
        Button::new(
            ComponentAction::TaskDelete(id).custom_id(),
            format!("🗑️ #{id}"),
            ButtonKind::Danger,
        ),
    ]
}

pub(crate) async fn list_page(ctx: &CommandContext, user: &User, page: usize) -> Result<Reply> {
    let tasks = ctx.database.tasks().list_for_user(user.id, None).await?;
    if tasks.is_empty() {
        return Ok(Reply::text(
            "📭 You have no tasks yet. Create one with /add_task.",
        ));
    }

    let page = paginate(&tasks, page);
    let mut text = format!("📋 **Your tasks** ({} total)\n\n", tasks.len());
    let mut reply = Reply::default();
    for task in page.items {
        text.push_str(&task_card(task, ctx.offset));
        text.push('\n');
        reply = reply.with_row(task_buttons(task));
    }
    reply.text = text;
    Ok(reply.with_row(pagination_row(&page, ComponentAction::TaskPage)))
}

/// A task by id, only if `user` owns it
async fn owned(ctx: &CommandContext, user: &User, id: i64) -> Result<Option<Task>> {
    Ok(ctx
        .database
        .tasks()
        .get_by_id(id)
        .await?
        .filter(|task| task.user_id == user.id))
}

pub(crate) async fn handle_action(
    ctx: &CommandContext,
    user: &User,
    action: ComponentAction,
) -> Result<Reply> {
    match action {
        ComponentAction::TaskComplete(id) => set_status(ctx, user, id, TaskStatus::Completed).await,
        ComponentAction::TaskProgress(id) => set_status(ctx, user, id, TaskStatus::InProgress).await,
        ComponentAction::TaskCancel(id) => set_status(ctx, user, id, TaskStatus::Cancelled).await,
        ComponentAction::TaskDelete(id) => {
            if owned(ctx, user, id).await?.is_none() {
                return Ok(not_found("Task"));
            }
            ctx.database.tasks().delete(id).await?;
            ctx.refresh_stats(user.id).await;
            info!("🗑️ Task {id} deleted by {}", user.external_id);
            Ok(Reply::text("🗑️ Task deleted."))
        }
        ComponentAction::TaskPage(page) => list_page(ctx, user, page).await,
        _ => Ok(Reply::default()),
    }
}

async fn set_status(
    ctx: &CommandContext,
    user: &User,
    id: i64,
    status: TaskStatus,
) -> Result<Reply> {
    if owned(ctx, user, id).await?.is_none() {
        return Ok(not_found("Task"));
    }
    let Some(task) = ctx.database.tasks().update_status(id, status, ctx.now()).await? else {
        return Ok(not_found("Task"));
    };
    ctx.refresh_stats(user.id).await;
    info!("✅ Task {id} is now {}", status.as_str());

    Ok(Reply::text(format!(
        "{} **Task {}**\n\n{}",
        status.emoji(),
        status.label(),
        task_card(&task, ctx.offset)
    ))
    .with_row(task_buttons(&task)))
}
