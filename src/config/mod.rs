//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `STUDIO` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use studio_consultant::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Chatting with {}", config.ai.chat_model);
//! ```

mod ai;
mod chat;
mod error;
mod logging;

pub use ai::AiConfig;
pub use chat::ChatConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};

use serde::Deserialize;

/// Plain environment variables accepted for the Gemini key, in priority order.
const API_KEY_FALLBACKS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Root application configuration
///
/// Every section has defaults; only the Gemini API key must be supplied.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Provider configuration (Gemini key, models, sampling)
    #[serde(default)]
    pub ai: AiConfig,

    /// Chat session configuration (timeout, history window)
    #[serde(default)]
    pub chat: ChatConfig,

    /// Logging configuration (filter, format)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `STUDIO` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    /// 5. Falls back to `GEMINI_API_KEY`, then `API_KEY`, for the key
    ///
    /// # Environment Variable Format
    ///
    /// - `STUDIO__AI__CHAT_MODEL=...` -> `ai.chat_model = ...`
    /// - `STUDIO__CHAT__EXCHANGE_TIMEOUT_SECS=60` -> `chat.exchange_timeout_secs = 60`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let mut config: Self = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("STUDIO")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        if !config.ai.has_gemini() {
            config.ai.gemini_api_key = API_KEY_FALLBACKS
                .iter()
                .filter_map(|name| std::env::var(name).ok())
                .find(|key| !key.trim().is_empty());
        }

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.chat.validate()?;
        Ok(())
    }
}
