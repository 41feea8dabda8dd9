use crate::{Config, WeatherResult, provider::wttr::WttrProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod wttr;

/// A source of current weather conditions.
///
/// Lookups never fail with `Err`: every outcome, including transport
/// failures, is folded into a [`WeatherResult`].
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, city: &str) -> WeatherResult;
}

/// Construct the configured provider.
pub fn provider_from_config(config: &Config) -> Box<dyn WeatherProvider> {
    Box::new(WttrProvider::with_base_url(config.weather_base_url.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_uses_configured_base_url() {
        let cfg = Config {
            weather_base_url: "http://127.0.0.1:8080/".to_string(),
            ..Config::default()
        };

        let provider = provider_from_config(&cfg);
        assert!(format!("{provider:?}").contains("http://127.0.0.1:8080"));
    }
}
