//! Direct messages over the Discord HTTP API

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serenity::http::Http;
use serenity::model::id::UserId;
use std::sync::Arc;

use crate::core::{chunk_for_message, Notifier, Reply};
use crate::message_components::render_components;

pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    /// Long texts are split; buttons ride on the last chunk
    async fn send(&self, external_id: u64, reply: &Reply) -> Result<()> {
        let dm = UserId(external_id)
            .create_dm_channel(&self.http)
            .await
            .with_context(|| format!("Failed to open DM channel with {external_id}"))?;

        let chunks = chunk_for_message(&reply.text);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            dm.send_message(&self.http, |m| {
                m.content(chunk);
                if i == last && !reply.rows.is_empty() {
                    m.set_components(render_components(reply));
                }
                m
            })
            .await
            .with_context(|| format!("Failed to send DM to {external_id}"))?;
        }
        debug!("Sent {} message(s) to {external_id}", chunks.len());
        Ok(())
    }
}
