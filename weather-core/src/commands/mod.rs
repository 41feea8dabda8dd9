//! Command handlers.
//!
//! Each handler is registered under its name in the
//! [`CommandRouter`](crate::router::CommandRouter) when the router is built.

use async_trait::async_trait;

use crate::reply::Reply;

pub mod help;
pub mod ping;
pub mod weather;

pub use help::HelpWeatherCommand;
pub use ping::PingCommand;
pub use weather::{WeatherCommand, format_weather, title_case};

/// Per-invocation context handed to a handler.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub prefix: char,
    pub author_id: String,
    pub author_name: String,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// When true the router rejects invocations without an argument before
    /// calling [`handle`](Self::handle).
    fn requires_argument(&self) -> bool {
        false
    }

    /// Reply to use instead of the generic missing-argument text.
    fn missing_argument_reply(&self, _prefix: char) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &CommandContext, arg: Option<&str>) -> anyhow::Result<Reply>;
}
