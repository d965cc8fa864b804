//! AI provider configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::ai::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_ONCE_MODEL};
use crate::application::studio::{CHAT_TEMPERATURE, CHAT_THINKING_BUDGET};
use crate::ports::GenerationParams;

/// Gemini provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Gemini API key
    pub gemini_api_key: Option<String>,

    /// REST base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for chat sessions
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used for description enhancement
    #[serde(default = "default_enhance_model")]
    pub enhance_model: String,

    /// Chat sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Chat reasoning token budget
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u32,
}

impl AiConfig {
    /// Check if a Gemini key is configured
    pub fn has_gemini(&self) -> bool {
        self.gemini_api_key.as_ref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Generation parameters for chat sessions
    pub fn chat_params(&self) -> GenerationParams {
        GenerationParams::default()
            .with_temperature(self.temperature)
            .with_thinking_budget(self.thinking_budget)
    }

    /// Builds the gateway configuration, if a key is present
    pub fn gateway_config(&self) -> Option<GeminiConfig> {
        let key = self.gemini_api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some(
            GeminiConfig::new(key)
                .with_base_url(self.base_url.clone())
                .with_chat_model(self.chat_model.clone())
                .with_once_model(self.enhance_model.clone()),
        )
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_gemini() {
            return Err(ValidationError::MissingRequired("GEMINI_API_KEY"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::InvalidTemperature);
        }

        if !self.base_url.starts_with("http") {
            return Err(ValidationError::InvalidBaseUrl);
        }

        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            enhance_model: default_enhance_model(),
            temperature: default_temperature(),
            thinking_budget: default_thinking_budget(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_enhance_model() -> String {
    DEFAULT_ONCE_MODEL.to_string()
}

fn default_temperature() -> f32 {
    CHAT_TEMPERATURE
}

fn default_thinking_budget() -> u32 {
    CHAT_THINKING_BUDGET
}
