use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::DEFAULT_WEATHER_BASE_URL,
    model::{NOT_AVAILABLE, WeatherReport, WeatherResult},
};

use super::WeatherProvider;

const CITY_NOT_FOUND: &str = "City not found";
const FETCH_FAILED: &str = "Error fetching weather data";

/// Current conditions from wttr.in's JSON (`format=j1`) endpoint.
#[derive(Debug, Clone)]
pub struct WttrProvider {
    base_url: String,
    http: Client,
}

impl Default for WttrProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WttrProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_WEATHER_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn request_url(&self, city: &str) -> String {
        format!("{}/{}?format=j1", self.base_url, urlencoding::encode(city))
    }

    /// `Ok(None)` means the service answered with something other than 200.
    async fn fetch_payload(&self, url: &str) -> Result<Option<Value>> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .context("Failed to send request to wttr.in")?;

        let status = res.status();
        if status != StatusCode::OK {
            debug!(%status, "wttr.in returned non-200 status");
            return Ok(None);
        }

        let body = res
            .text()
            .await
            .context("Failed to read wttr.in response body")?;

        let payload = serde_json::from_str(&body).context("Failed to parse wttr.in JSON")?;
        Ok(Some(payload))
    }
}

#[async_trait]
impl WeatherProvider for WttrProvider {
    async fn fetch(&self, city: &str) -> WeatherResult {
        let url = self.request_url(city);
        debug!(%url, "fetching current conditions");

        match self.fetch_payload(&url).await {
            Ok(Some(payload)) => interpret_payload(&payload),
            Ok(None) => WeatherResult::not_found(CITY_NOT_FOUND),
            Err(e) => {
                warn!(city, error = %format!("{e:#}"), "weather fetch failed");
                WeatherResult::fetch_error(format!("{FETCH_FAILED}: {e:#}"))
            }
        }
    }
}

/// Map a decoded 200 response onto a [`WeatherResult`].
///
/// Only a string `cod` of `"404"` or `"500"` marks an error payload; anything
/// else is read as conditions, with missing pieces rendered as `"N/A"`.
pub fn interpret_payload(payload: &Value) -> WeatherResult {
    let message = || {
        payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(FETCH_FAILED)
            .to_string()
    };

    match payload.get("cod").and_then(Value::as_str) {
        Some("404") => return WeatherResult::not_found(message()),
        Some("500") => return WeatherResult::fetch_error(message()),
        _ => {}
    }

    let current = payload
        .get("current_condition")
        .and_then(Value::as_array)
        .and_then(|conditions| conditions.first());

    let field = |key: &str| render(current.and_then(|c| c.get(key)));

    let description = current
        .and_then(|c| c.get("weatherDesc"))
        .and_then(Value::as_array)
        .and_then(|descs| descs.first())
        .and_then(|d| d.get("value"));

    WeatherResult::Success(WeatherReport {
        description: render(description),
        temperature_c: field("temp_C"),
        temperature_f: field("temp_F"),
        humidity_pct: field("humidity"),
        wind_speed_kmh: field("windspeedKmph"),
        pressure_mb: field("pressure"),
    })
}

fn render(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => NOT_AVAILABLE.to_string(),
        Some(other) => other.to_string(),
    }
}
