//! Chat session configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Chat session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Per-exchange timeout in seconds
    #[serde(default = "default_exchange_timeout")]
    pub exchange_timeout_secs: u64,

    /// Prior turns sent to the provider (unset = whole transcript)
    pub max_history_turns: Option<usize>,
}

impl ChatConfig {
    /// Get exchange timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }

    /// Validate chat configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.exchange_timeout_secs == 0 || self.exchange_timeout_secs > 600 {
            return Err(ValidationError::InvalidTimeout);
        }

        if self.max_history_turns == Some(0) {
            return Err(ValidationError::InvalidHistoryWindow);
        }

        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            exchange_timeout_secs: default_exchange_timeout(),
            max_history_turns: None,
        }
    }
}

fn default_exchange_timeout() -> u64 {
    120
}
