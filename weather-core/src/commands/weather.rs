use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{CommandContext, CommandHandler};
use crate::{
    model::WeatherResult,
    provider::WeatherProvider,
    reply::{Embed, Reply},
};

const EMBED_COLOR: u32 = 0x00ff00;

/// `weather <city>`: current conditions for a city.
#[derive(Debug, Clone)]
pub struct WeatherCommand {
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherCommand {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }
}

pub fn usage_reply(prefix: char) -> String {
    format!("Please provide a city name. Usage: {prefix}weather <city>")
}

#[async_trait]
impl CommandHandler for WeatherCommand {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn requires_argument(&self) -> bool {
        true
    }

    fn missing_argument_reply(&self, prefix: char) -> Option<String> {
        Some(usage_reply(prefix))
    }

    async fn handle(&self, ctx: &CommandContext, arg: Option<&str>) -> anyhow::Result<Reply> {
        info!(city = ?arg, "weather command received");

        let Some(city) = arg.filter(|c| !c.trim().is_empty()) else {
            return Ok(Reply::Text(usage_reply(ctx.prefix)));
        };

        let result = self.provider.fetch(city).await;
        Ok(format_weather(city, result))
    }
}

/// Render a lookup outcome as a chat reply.
pub fn format_weather(city: &str, result: WeatherResult) -> Reply {
    match result {
        WeatherResult::Success(report) => Reply::Embed(
            Embed::new(
                format!("Weather in {}", title_case(city)),
                report.description,
                EMBED_COLOR,
            )
            .field(
                "Temperature",
                format!("{}°C ({}°F)", report.temperature_c, report.temperature_f),
                false,
            )
            .field("Humidity", format!("{}%", report.humidity_pct), true)
            .field("Wind Speed", format!("{} km/h", report.wind_speed_kmh), true)
            .field("Pressure", format!("{} mb", report.pressure_mb), true),
        ),
        WeatherResult::NotFound { message } | WeatherResult::FetchError { message } => {
            Reply::Text(message)
        }
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
///
/// `"new york"` → `"New York"`, `"o'neill"` → `"O'Neill"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;

    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}
