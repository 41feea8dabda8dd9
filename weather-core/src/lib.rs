//! Core library for the weather chat bot.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over the weather data source
//! - Command handlers and the router that dispatches to them
//! - The seam to the chat platform
//!
//! It is used by `weather-bot`, but knows nothing about any particular chat platform.

pub mod commands;
pub mod config;
pub mod model;
pub mod platform;
pub mod provider;
pub mod reply;
pub mod router;

pub use config::{Config, ConfigError, Credentials};
pub use model::{WeatherReport, WeatherResult};
pub use platform::{ChatPlatform, InboundMessage};
pub use provider::WeatherProvider;
pub use reply::{Embed, EmbedField, Reply};
pub use router::{CommandError, CommandRouter, Invocation};
