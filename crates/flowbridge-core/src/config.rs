//! Configuration and settings management
//!
//! Loads relay settings from config files and environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Voiceflow runtime endpoint.
pub const DEFAULT_VOICEFLOW_BASE_URL: &str = "https://general-runtime.voiceflow.com";
/// Default timeout for one interact call, in seconds.
pub const DEFAULT_VOICEFLOW_TIMEOUT_SECS: u64 = 30;
/// Default maximum number of pending buttons kept in the callback registry.
pub const DEFAULT_CALLBACK_CAPACITY: u64 = 10_000;
/// Default lifetime of a pending button, in seconds (24 hours).
pub const DEFAULT_CALLBACK_TTL_SECS: u64 = 86_400;

/// Build the layered configuration shared by every crate of the relay.
///
/// Sources, lowest priority first: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` variables, then bare environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if any source fails to load.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE maps onto snake_case keys; empty vars count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Settings for the Voiceflow backend and the callback registry
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelaySettings {
    /// Voiceflow Dialog Manager API key, sent verbatim as `Authorization`
    pub voiceflow_api_key: String,

    /// Base URL of the Voiceflow runtime
    #[serde(default = "default_voiceflow_base_url")]
    pub voiceflow_base_url: String,

    /// Optional `versionID` header (e.g. `production`)
    #[serde(default)]
    pub voiceflow_version_id: Option<String>,

    /// Timeout for one interact call
    #[serde(default = "default_voiceflow_timeout_secs")]
    pub voiceflow_timeout_secs: u64,

    /// Maximum pending buttons kept in memory
    #[serde(default = "default_callback_capacity")]
    pub callback_capacity: u64,

    /// Lifetime of a pending button
    #[serde(default = "default_callback_ttl_secs")]
    pub callback_ttl_secs: u64,
}

fn default_voiceflow_base_url() -> String {
    DEFAULT_VOICEFLOW_BASE_URL.to_string()
}

const fn default_voiceflow_timeout_secs() -> u64 {
    DEFAULT_VOICEFLOW_TIMEOUT_SECS
}

const fn default_callback_capacity() -> u64 {
    DEFAULT_CALLBACK_CAPACITY
}

const fn default_callback_ttl_secs() -> u64 {
    DEFAULT_CALLBACK_TTL_SECS
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            voiceflow_api_key: String::new(),
            voiceflow_base_url: default_voiceflow_base_url(),
            voiceflow_version_id: None,
            voiceflow_timeout_secs: DEFAULT_VOICEFLOW_TIMEOUT_SECS,
            callback_capacity: DEFAULT_CALLBACK_CAPACITY,
            callback_ttl_secs: DEFAULT_CALLBACK_TTL_SECS,
        }
    }
}

impl RelaySettings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use flowbridge_core::config::RelaySettings;
    ///
    /// let settings = RelaySettings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the API key is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = build_config()?.try_deserialize()?;
        if settings.voiceflow_api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "VOICEFLOW_API_KEY must not be empty".to_string(),
            ));
        }
        Ok(settings)
    }

    /// Timeout applied to every backend call
    #[must_use]
    pub const fn voiceflow_timeout(&self) -> Duration {
        Duration::from_secs(self.voiceflow_timeout_secs)
    }

    /// Lifetime of a registered button
    #[must_use]
    pub const fn callback_ttl(&self) -> Duration {
        Duration::from_secs(self.callback_ttl_secs)
    }
}
