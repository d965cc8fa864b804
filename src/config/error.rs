//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Temperature must be between 0.0 and 2.0")]
    InvalidTemperature,

    #[error("Exchange timeout must be between 1 and 600 seconds")]
    InvalidTimeout,

    #[error("History window must be greater than zero")]
    InvalidHistoryWindow,

    #[error("Invalid base URL format")]
    InvalidBaseUrl,
}
