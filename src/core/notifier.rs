use anyhow::Result;
use async_trait::async_trait;

use super::reply::Reply;

/// Outbound direct messages to a chat user
///
/// Implemented by the Discord adapter; reminder delivery and broadcasts only
/// ever talk to this trait.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, external_id: u64, reply: &Reply) -> Result<()>;
}
