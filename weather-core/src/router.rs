//! Command Router.
//!
//! Turns inbound chat text into a handler call and the handler's outcome into
//! a reply. Every failure inside a command ends up as a reply here; nothing a
//! single command does is propagated to the platform connection.

use std::{any::Any, collections::HashMap, panic::AssertUnwindSafe, sync::Arc};

use anyhow::{Context, anyhow};
use futures_util::FutureExt;
use tracing::{error, info, warn};

use crate::{
    commands::{CommandContext, CommandHandler, HelpWeatherCommand, PingCommand, WeatherCommand},
    platform::{ChatPlatform, InboundMessage},
    provider::WeatherProvider,
    reply::Reply,
};

/// A parsed command: name plus the trimmed remainder of the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub arg: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command not found. Use {prefix}help_weather to see available commands.")]
    NotFound { name: String, prefix: char },

    #[error("{reply}")]
    MissingArgument { command: String, reply: String },

    #[error("An error occurred while processing the command: {0:#}")]
    Failed(#[source] anyhow::Error),
}

pub struct CommandRouter {
    prefix: char,
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
    platform: Arc<dyn ChatPlatform>,
}

impl CommandRouter {
    /// Build a router with the bot's standard command set.
    pub fn new(
        prefix: char,
        provider: Arc<dyn WeatherProvider>,
        platform: Arc<dyn ChatPlatform>,
    ) -> Self {
        let mut router = Self {
            prefix,
            handlers: HashMap::new(),
            platform,
        };
        router.register(Arc::new(PingCommand));
        router.register(Arc::new(WeatherCommand::new(provider)));
        router.register(Arc::new(HelpWeatherCommand));
        router
    }

    /// Add or replace a handler under its own name.
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Status line advertised once the platform connection is up.
    pub fn activity_text(&self) -> String {
        format!("{}weather <city>", self.prefix)
    }

    /// `None` when the message is not addressed to the bot.
    pub fn parse(&self, content: &str) -> Option<Invocation> {
        let rest = content.strip_prefix(self.prefix)?;

        let (name, arg) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim()),
            None => (rest, ""),
        };

        if name.is_empty() {
            return None;
        }

        Some(Invocation {
            name: name.to_string(),
            arg: (!arg.is_empty()).then(|| arg.to_string()),
        })
    }

    pub async fn dispatch(
        &self,
        invocation: &Invocation,
        ctx: &CommandContext,
    ) -> Result<Reply, CommandError> {
        let handler = self
            .handlers
            .get(invocation.name.as_str())
            .ok_or_else(|| CommandError::NotFound {
                name: invocation.name.clone(),
                prefix: self.prefix,
            })?;

        if handler.requires_argument() && invocation.arg.is_none() {
            let reply = handler
                .missing_argument_reply(self.prefix)
                .unwrap_or_else(|| {
                    format!("Missing required argument for {} command.", invocation.name)
                });
            return Err(CommandError::MissingArgument {
                command: invocation.name.clone(),
                reply,
            });
        }

        handler
            .handle(ctx, invocation.arg.as_deref())
            .await
            .map_err(CommandError::Failed)
    }

    /// Work out the reply for `message`, if it warrants one.
    pub async fn respond(&self, message: &InboundMessage) -> Option<Reply> {
        if message.author_is_bot {
            return None;
        }

        let invocation = self.parse(&message.content)?;
        let ctx = CommandContext {
            prefix: self.prefix,
            author_id: message.author_id.clone(),
            author_name: message.author_name.clone(),
        };

        let outcome = AssertUnwindSafe(self.dispatch(&invocation, &ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(CommandError::Failed(anyhow!(panic_message(&*panic)))));

        match outcome {
            Ok(reply) => Some(reply),
            Err(err) => {
                match &err {
                    CommandError::Failed(cause) => {
                        error!(command = %invocation.name, error = %format!("{cause:#}"), "unexpected command error")
                    }
                    other => warn!(command = %invocation.name, error = %other, "command error occurred"),
                }
                Some(Reply::Text(err.to_string()))
            }
        }
    }

    /// Handle one inbound message end to end, sending any reply back.
    pub async fn handle_message(&self, message: &InboundMessage) -> anyhow::Result<()> {
        let Some(reply) = self.respond(message).await else {
            return Ok(());
        };

        self.platform
            .send_reply(&message.channel_id, &reply)
            .await
            .with_context(|| format!("Failed to send reply to channel {}", message.channel_id))
    }

    /// One-time hook for when the platform connection is established.
    pub async fn on_ready(&self, user: &str, guild_count: usize) -> anyhow::Result<()> {
        info!("{user} has connected");
        info!("Bot is in {guild_count} guilds");

        self.platform
            .set_activity(&self.activity_text())
            .await
            .context("Failed to set bot activity")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "command handler panicked".to_string()
    }
}
