//! Binary crate for the `weather-bot` Discord bot.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup
//! - The Discord connection (REST + gateway)

use clap::Parser;

mod cli;
mod discord;
mod gateway;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
