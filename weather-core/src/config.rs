use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Environment variable holding the bot token.
pub const TOKEN_ENV_VAR: &str = "DISCORD_TOKEN";

pub const DEFAULT_PREFIX: char = '!';
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://wttr.in";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DISCORD_TOKEN is not set.\nHint: export it or put it in a .env file next to the bot.")]
    MissingToken,

    #[error("Command prefix must not be whitespace (got {0:?})")]
    InvalidPrefix(char),
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// prefix = "!"
/// weather_base_url = "https://wttr.in"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Single character that marks a message as a command.
    pub prefix: char,

    /// Root of the weather data source; the city is appended as a path segment.
    pub weather_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX,
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-bot", "weather-bot")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_whitespace() {
            return Err(ConfigError::InvalidPrefix(self.prefix));
        }
        Ok(())
    }
}

/// Secrets that never touch the config file.
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"<redacted>").finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(TOKEN_ENV_VAR) {
            Some(token) if !token.trim().is_empty() => Ok(Self {
                token: token.trim().to_string(),
            }),
            _ => Err(ConfigError::MissingToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("weather-core-test-{}-{name}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn defaults_match_bot_conventions() {
        let cfg = Config::default();
        assert_eq!(cfg.prefix, '!');
        assert_eq!(cfg.weather_base_url, "https://wttr.in");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let cfg = Config::load_from(&temp_path("missing")).expect("defaults");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load_keeps_custom_prefix() {
        let path = temp_path("save");
        let cfg = Config {
            prefix: '?',
            ..Config::default()
        };

        cfg.save_to(&path).expect("save should succeed");
        let loaded = Config::load_from(&path).expect("load should succeed");
        assert_eq!(loaded.prefix, '?');
        assert_eq!(loaded.weather_base_url, DEFAULT_WEATHER_BASE_URL);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_path("partial");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "weather_base_url = \"http://localhost:9000\"\n").unwrap();

        let loaded = Config::load_from(&path).expect("load should succeed");
        assert_eq!(loaded.prefix, '!');
        assert_eq!(loaded.weather_base_url, "http://localhost:9000");

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn whitespace_prefix_is_rejected() {
        let cfg = Config {
            prefix: ' ',
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidPrefix(' ')));
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = Credentials::from_lookup(|_| None).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }

    #[test]
    fn blank_token_is_an_error() {
        let err = Credentials::from_lookup(|_| Some("   ".to_string())).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
    }

    #[test]
    fn token_is_read_and_redacted_in_debug() {
        let creds = Credentials::from_lookup(|key| {
            (key == TOKEN_ENV_VAR).then(|| "abc.def".to_string())
        })
        .expect("token present");

        assert_eq!(creds.token, "abc.def");
        assert!(!format!("{creds:?}").contains("abc.def"));
    }
}
