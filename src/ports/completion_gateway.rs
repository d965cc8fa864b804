//! Completion Gateway Port - Interface to the external text-generation provider.
//!
//! The conversation session and the description enhancer only ever talk to a
//! provider through this trait, so a test double can stand in for the real
//! HTTP client.
//!
//! # Design
//!
//! - Two capabilities: `complete` (history + new message + optional system
//!   preamble) and `complete_once` (single prompt, no history)
//! - Provider-agnostic request shape built from domain turns
//! - One request, one response: no streaming, no retries
//! - A single error type; callers react to every variant the same way
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct EchoGateway;
//!
//! #[async_trait]
//! impl CompletionGateway for EchoGateway {
//!     async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError> {
//!         Ok(CompletionResponse::new(request.new_message, "echo"))
//!     }
//!     // ... other methods
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::conversation::{PendingExchange, Turn};

/// Port for text-generation provider interactions.
///
/// Implementations must be reentrant: independent sessions may call the same
/// gateway concurrently, each with its own request.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Generates the next assistant reply for a conversation.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, GatewayError>;

    /// Generates a reply to a single prompt, with no history or preamble.
    async fn complete_once(&self, prompt: &str) -> Result<CompletionResponse, GatewayError>;

    /// Get gateway information (provider name, models).
    fn gateway_info(&self) -> GatewayInfo;
}

/// Request for a conversational completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// History before the new message, in chronological order.
    pub prior_turns: Vec<Turn>,
    /// The new user message, sent as the final user entry.
    pub new_message: String,
    /// Out-of-band instructions (persona, policy). Never part of the turn list.
    pub system_preamble: Option<String>,
    /// Sampling and reasoning parameters.
    pub params: GenerationParams,
}

impl CompletionRequest {
    /// Creates a request with no history, preamble or parameters.
    pub fn new(new_message: impl Into<String>) -> Self {
        Self {
            prior_turns: Vec::new(),
            new_message: new_message.into(),
            system_preamble: None,
            params: GenerationParams::default(),
        }
    }

    /// Builds a request from an accepted session exchange.
    pub fn from_exchange(exchange: PendingExchange) -> Self {
        Self {
            prior_turns: exchange.prior_turns,
            new_message: exchange.message,
            system_preamble: None,
            params: GenerationParams::default(),
        }
    }

    /// Sets the prior turns.
    pub fn with_prior_turns(mut self, turns: Vec<Turn>) -> Self {
        self.prior_turns = turns;
        self
    }

    /// Sets the system preamble.
    pub fn with_system_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.system_preamble = Some(preamble.into());
        self
    }

    /// Sets the generation parameters.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// All turns in send order: history followed by the new user message.
    pub fn ordered_turns(&self) -> Vec<Turn> {
        let mut turns = self.prior_turns.clone();
        turns.push(Turn::user(self.new_message.clone()));
        turns
    }
}

/// Generation parameters forwarded to the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Temperature for response randomness (0.0 = deterministic).
    pub temperature: Option<f32>,
    /// Token budget for the model's internal reasoning.
    pub thinking_budget: Option<u32>,
    /// Maximum tokens to generate.
    pub max_output_tokens: Option<u32>,
}

impl GenerationParams {
    /// Sets the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Sets the thinking budget.
    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }

    /// Sets the maximum output tokens.
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.thinking_budget.is_none()
            && self.max_output_tokens.is_none()
    }
}

/// Response from a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Generated text.
    pub content: String,
    /// Model that generated the response.
    pub model: String,
    /// Token usage reported by the provider.
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Creates a response with zero usage.
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: TokenUsage::zero(),
        }
    }

    /// Sets the token usage.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion).
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Creates new token usage.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Creates zero usage.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Gateway information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    /// Provider name (e.g., "gemini", "mock").
    pub name: String,
    /// Model used by `complete`.
    pub chat_model: String,
    /// Model used by `complete_once`.
    pub once_model: String,
}

impl GatewayInfo {
    /// Creates new gateway info.
    pub fn new(
        name: impl Into<String>,
        chat_model: impl Into<String>,
        once_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            chat_model: chat_model.into(),
            once_model: once_model.into(),
        }
    }
}

/// Gateway errors.
///
/// Variants exist for diagnostics only. Sessions and the enhancer convert
/// every one of them into the same fallback text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The provider answered but produced no usable text.
    #[error("provider returned no text")]
    EmptyResponse,

    /// The provider response could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// No response arrived within the exchange timeout.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u64,
    },
}

impl GatewayError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
