//! Process configuration.
//!
//! Configuration comes from the environment, with CLI flags layered on top
//! by `main`. Missing Telegram credentials are not an error; the scheduler
//! falls back to logging notifications.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the job store file.
const ENV_STORE: &str = "MINICRON_STORE";
/// Environment variable holding the Telegram bot token.
const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
/// Environment variable holding the Telegram chat id.
const ENV_CHAT_ID: &str = "CHAT_ID";

/// Default job store path, relative to the working directory.
const DEFAULT_STORE_PATH: &str = "data/cronjobs.json";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable failed to parse.
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Telegram notification credentials.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token.
    pub bot_token: String,
    /// Destination chat id.
    pub chat_id: i64,
}

/// Scheduler process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the JSON job store file.
    pub store_path: PathBuf,
    /// Upper bound on a single notification send.
    pub notify_timeout: Duration,
    /// Telegram credentials, when both are configured.
    pub telegram: Option<TelegramConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            notify_timeout: Duration::from_secs(10),
            telegram: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(path) = std::env::var(ENV_STORE) {
            config.store_path = PathBuf::from(path);
        }

        // Both credentials must be present; one without the other is
        // treated as unconfigured.
        let token = std::env::var(ENV_BOT_TOKEN).ok();
        let chat = std::env::var(ENV_CHAT_ID).ok();
        if let (Some(bot_token), Some(chat)) = (token, chat) {
            let chat_id = chat.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                var: ENV_CHAT_ID,
                value: chat,
            })?;
            config.telegram = Some(TelegramConfig { bot_token, chat_id });
        }

        Ok(config)
    }

    /// Override the store path.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }
}
