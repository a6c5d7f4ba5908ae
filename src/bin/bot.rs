use anyhow::Result;
use dotenvy::dotenv;
use log::{debug, error, info, warn};
use serenity::async_trait;
use serenity::builder::CreateComponents;
use serenity::http::Http;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::model::user::User as DiscordUser;
use serenity::prelude::*;
use std::sync::Arc;

use student_tracker::commands::{
    command_args, register_global_commands, register_guild_commands, Actor, CommandContext,
    Dispatcher, Input,
};
use student_tracker::core::{chunk_for_message, Clock, Config, Notifier, Reply, SystemClock};
use student_tracker::database::{Database, Role};
use student_tracker::discord_notifier::DiscordNotifier;
use student_tracker::features::{
    Broadcaster, CalendarSync, NoopCalendar, NotifierDelivery, ReminderScheduler, WebhookCalendar,
};
use student_tracker::message_components::render_components;

const FAILURE_TEXT: &str = "❌ Something went wrong while handling that. Please try again.";

struct Handler {
    dispatcher: Arc<Dispatcher>,
    guild_id: Option<GuildId>,
}

/// One Discord message: a chunk of reply text, with buttons on the last chunk
struct Outgoing {
    content: String,
    components: Option<CreateComponents>,
}

fn to_messages(replies: &[Reply]) -> Vec<Outgoing> {
    let mut messages = Vec::new();
    for reply in replies {
        let chunks = chunk_for_message(&reply.text);
        let last = chunks.len().saturating_sub(1);
        for (i, content) in chunks.into_iter().enumerate() {
            let components = (i == last && !reply.rows.is_empty()).then(|| render_components(reply));
            messages.push(Outgoing {
                content,
                components,
            });
        }
    }
    messages
}

fn acknowledgement() -> Outgoing {
    Outgoing {
        content: "✅".to_string(),
        components: None,
    }
}

fn actor_for(user: &DiscordUser) -> Actor {
    Actor::with_names(user.id.0, user.name.clone(), None)
}

impl Handler {
    async fn dispatch_or_apologise(&self, actor: &Actor, input: Input) -> Vec<Reply> {
        match self.dispatcher.dispatch(actor, input).await {
            Ok(replies) => replies,
            Err(e) => {
                error!("Failed to handle input from {}: {e:#}", actor.external_id);
                vec![Reply::text(FAILURE_TEXT)]
            }
        }
    }

    /// Discord drops interactions left unacknowledged for three seconds
    async fn answer_command(
        &self,
        http: &Http,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        command
            .create_interaction_response(http, |response| {
                response.kind(InteractionResponseType::DeferredChannelMessageWithSource)
            })
            .await?;

        let name = command.data.name.clone();
        let args = command_args(&name, &command.data.options);
        let actor = actor_for(&command.user);
        let replies = self
            .dispatch_or_apologise(&actor, Input::Command { name, args })
            .await;

        let mut messages = to_messages(&replies).into_iter();
        let first = messages.next().unwrap_or_else(acknowledgement);
        command
            .edit_original_interaction_response(http, |message| {
                message.content(&first.content);
                if let Some(components) = first.components {
                    message.set_components(components);
                }
                message
            })
            .await?;

        for outgoing in messages {
            command
                .create_followup_message(http, |message| {
                    message.content(&outgoing.content);
                    if let Some(components) = outgoing.components {
                        message.set_components(components);
                    }
                    message
                })
                .await?;
        }
        Ok(())
    }

    /// The first reply replaces the clicked message, so stale buttons disappear
    async fn answer_component(
        &self,
        http: &Http,
        component: &MessageComponentInteraction,
    ) -> Result<()> {
        component
            .create_interaction_response(http, |response| {
                response.kind(InteractionResponseType::DeferredUpdateMessage)
            })
            .await?;

        let actor = actor_for(&component.user);
        let input = Input::Button(component.data.custom_id.clone());
        let replies = self.dispatch_or_apologise(&actor, input).await;

        let mut messages = to_messages(&replies).into_iter();
        let Some(first) = messages.next() else {
            return Ok(());
        };
        component
            .edit_original_interaction_response(http, |message| {
                message
                    .content(&first.content)
                    .set_components(first.components.unwrap_or_default())
            })
            .await?;

        for outgoing in messages {
            component
                .create_followup_message(http, |message| {
                    message.content(&outgoing.content);
                    if let Some(components) = outgoing.components {
                        message.set_components(components);
                    }
                    message
                })
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        // Guild chatter is ignored unless the author is mid-conversation
        let sessions = &self.dispatcher.context().sessions;
        if msg.guild_id.is_some() && !sessions.contains(msg.author.id.0) {
            return;
        }

        let actor = actor_for(&msg.author);
        let input = self.dispatcher.parse_text(&msg.content);
        let replies = self.dispatch_or_apologise(&actor, input).await;

        for outgoing in to_messages(&replies) {
            let sent = msg
                .channel_id
                .send_message(&ctx.http, |m| {
                    m.content(&outgoing.content);
                    if let Some(components) = outgoing.components {
                        m.set_components(components);
                    }
                    m
                })
                .await;
            if let Err(why) = sent {
                error!("Failed to send reply: {why}");
                break;
            }
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        // Register slash commands - use guild commands for development (instant), global for production
        if let Some(guild_id) = self.guild_id {
            info!("🔧 Development mode: Registering commands for guild {guild_id}");
            if let Err(e) = register_guild_commands(&ctx, guild_id).await {
                error!("❌ Failed to register guild slash commands: {e}");
            } else {
                info!("✅ Successfully registered slash commands for guild {guild_id} (instant update)");
            }
        } else {
            info!("🌍 Production mode: Registering commands globally");
            if let Err(e) = register_global_commands(&ctx).await {
                error!("❌ Failed to register global slash commands: {e}");
            } else {
                info!("✅ Successfully registered slash commands globally (may take up to 1 hour to propagate)");
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::ApplicationCommand(command) => {
                if let Err(e) = self.answer_command(&ctx.http, &command).await {
                    error!(
                        "Error answering slash command '{}': {e}",
                        command.data.name
                    );
                }
            }
            Interaction::MessageComponent(component) => {
                if let Err(e) = self.answer_component(&ctx.http, &component).await {
                    error!(
                        "Error answering component interaction '{}': {e}",
                        component.data.custom_id
                    );
                }
            }
            other => debug!("Ignoring interaction {:?}", other.kind()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Student Tracker bot...");
    if config.debug {
        debug!(
            "Database: {}, timezone offset: {}, calendar sync: {}",
            config.database_path,
            config.timezone_offset,
            config.calendar_webhook_url.is_some()
        );
    }

    let database = Database::new(&config.database_path).await?;

    // The configured owner is always a superadmin
    let users = database.users();
    users.get_or_create(config.admin_id, None, None).await?;
    users.set_role(config.admin_id, Role::Superadmin).await?;
    info!("👑 Superadmin: {}", config.admin_id);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier: Arc<dyn Notifier> =
        Arc::new(DiscordNotifier::new(Arc::new(Http::new(&config.discord_token))));

    let scheduler = ReminderScheduler::new(database.clone(), clock.clone());
    scheduler.set_delivery(Arc::new(NotifierDelivery::new(
        notifier.clone(),
        config.timezone_offset,
    )))?;

    let calendar: Arc<dyn CalendarSync> = match &config.calendar_webhook_url {
        Some(url) => {
            info!("📅 Calendar sync enabled");
            Arc::new(WebhookCalendar::new(url.clone())?)
        }
        None => {
            info!("📅 No CALENDAR_WEBHOOK_URL set - calendar sync disabled");
            Arc::new(NoopCalendar)
        }
    };

    let ctx = Arc::new(CommandContext::new(
        database,
        scheduler.clone(),
        Broadcaster::new(notifier),
        calendar,
        clock,
        config.timezone_offset,
        config.database_path.clone(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(ctx));

    let restored = scheduler.reconcile_on_startup().await?;
    info!("⏰ Restored {restored} pending reminder timer(s)");
    scheduler.start();

    // Parse guild ID if provided for development mode
    let guild_id = config
        .discord_guild_id
        .as_ref()
        .and_then(|id| id.parse::<u64>().ok())
        .map(GuildId);

    let handler = Handler {
        dispatcher,
        guild_id,
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    let shard_manager = client.shard_manager.clone();
    let shutdown_scheduler = scheduler.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for ctrl-c: {e}");
            return;
        }
        info!("🛑 Shutting down...");
        shutdown_scheduler.stop();
        shard_manager.lock().await.shutdown_all().await;
    });

    info!("Establishing WebSocket connection to Discord gateway...");
    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        scheduler.stop();
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use student_tracker::core::{Button, ButtonKind};

    #[test]
    fn test_buttons_ride_on_last_chunk() {
        let long = "line\n".repeat(1000);
        let reply = Reply::text(long).with_row(vec![Button::new(
            "back_to_menu",
            "Back",
            ButtonKind::Secondary,
        )]);
        let messages = to_messages(&[reply]);
        assert!(messages.len() > 1);
        let (last, rest) = messages.split_last().unwrap();
        assert!(last.components.is_some());
        assert!(rest.iter().all(|m| m.components.is_none()));
    }

    #[test]
    fn test_plain_replies_map_one_to_one() {
        let messages = to_messages(&[Reply::text("one"), Reply::text("two")]);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
        assert!(messages.iter().all(|m| m.components.is_none()));
        assert!(to_messages(&[]).is_empty());
    }
}
