use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use weather_core::{
    CommandRouter, Config, Credentials, WeatherProvider,
    commands::{format_weather, weather::usage_reply},
    provider::provider_from_config,
};

use crate::{discord::DiscordClient, gateway::Gateway};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-bot", version, about = "Discord bot that reports current weather")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to Discord and answer commands until interrupted.
    Run {
        /// Override the configured command prefix for this run.
        #[arg(long)]
        prefix: Option<char>,
    },

    /// Look up a city once and print the reply the bot would send.
    Show {
        /// City name, e.g. "London" or "New York".
        city: String,
    },

    /// Interactively set the command prefix and weather source.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Run { prefix } => run_bot(prefix).await,
            Command::Show { city } => show(&city).await,
            Command::Configure => configure(),
        }
    }
}

async fn run_bot(prefix: Option<char>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(prefix) = prefix {
        config.prefix = prefix;
        config.validate()?;
    }

    let credentials = Credentials::from_env()?;
    let client = Arc::new(DiscordClient::new(credentials.token));
    let me = client.verify_token().await?;
    info!(user = %me.username, id = %me.id, "authenticated with Discord");

    let provider: Arc<dyn WeatherProvider> = Arc::from(provider_from_config(&config));
    let router = Arc::new(CommandRouter::new(config.prefix, provider, client.clone()));
    let gateway = Gateway::new(client, router);

    tokio::select! {
        res = gateway.run() => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}

async fn show(city: &str) -> Result<()> {
    let config = Config::load()?;
    let city = city.trim();

    if city.is_empty() {
        println!("{}", usage_reply(config.prefix));
        return Ok(());
    }

    let provider = provider_from_config(&config);
    let reply = format_weather(city, provider.fetch(city).await);
    println!("{}", reply.to_plain_text());
    Ok(())
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let prefix = inquire::Text::new("Command prefix:")
        .with_default(&config.prefix.to_string())
        .prompt()?;
    config.prefix = parse_prefix(&prefix)?;
    config.validate()?;

    let base_url = inquire::Text::new("Weather source base URL:")
        .with_default(&config.weather_base_url)
        .prompt()?;
    config.weather_base_url = base_url.trim().to_string();

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn parse_prefix(input: &str) -> Result<char> {
    let mut chars = input.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => bail!("Command prefix must be exactly one character (got {input:?})"),
    }
}
