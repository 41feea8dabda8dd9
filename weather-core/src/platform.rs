use async_trait::async_trait;

use crate::reply::Reply;

/// The parts of an inbound chat message the router reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub author_id: String,
    pub author_name: String,
    pub author_is_bot: bool,
    pub channel_id: String,
    pub content: String,
}

/// Outbound side of a chat platform connection (Discord, a test double, ...).
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Post `reply` to the channel the command came from.
    async fn send_reply(&self, channel_id: &str, reply: &Reply) -> anyhow::Result<()>;

    /// Set the bot's visible activity/status line.
    async fn set_activity(&self, text: &str) -> anyhow::Result<()>;
}
