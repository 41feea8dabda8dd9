use async_trait::async_trait;
use tracing::info;

use super::{CommandContext, CommandHandler};
use crate::reply::Reply;

/// Liveness check.
#[derive(Debug, Default)]
pub struct PingCommand;

#[async_trait]
impl CommandHandler for PingCommand {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn handle(&self, ctx: &CommandContext, _arg: Option<&str>) -> anyhow::Result<Reply> {
        info!(author = %ctx.author_name, author_id = %ctx.author_id, "ping command received");
        Ok(Reply::text("Pong!"))
    }
}
