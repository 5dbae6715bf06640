//! Telegram transport settings.

use config::ConfigError;
use flowbridge_core::config::RelaySettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token.
    pub telegram_token: String,
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Relay settings shared across transport handlers.
    pub relay: Arc<RelaySettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(relay: RelaySettings, telegram: TelegramSettings) -> Self {
        Self {
            relay: Arc::new(relay),
            telegram: Arc::new(telegram),
        }
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the token is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = flowbridge_core::config::build_config()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_TOKEN must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
