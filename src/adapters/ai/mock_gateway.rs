//! Mock Completion Gateway for testing.
//!
//! Provides a configurable mock implementation of the CompletionGateway port,
//! allowing tests to run without calling the real provider.
//!
//! # Features
//!
//! - Pre-configured replies, consumed in order by both capabilities
//! - Simulated delays for timeout and interleaving tests
//! - Error injection for fallback testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let gateway = MockGateway::new()
//!     .with_response("Hello, I'm the studio agent!")
//!     .with_delay(Duration::from_millis(100));
//!
//! let response = gateway.complete(request).await?;
//! assert_eq!(response.content, "Hello, I'm the studio agent!");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    CompletionGateway, CompletionRequest, CompletionResponse, GatewayError, GatewayInfo,
    TokenUsage,
};

/// Reply returned once the queue is exhausted.
pub const DEFAULT_MOCK_REPLY: &str = "Mock response";

/// Mock gateway for testing.
///
/// Clones share the same queue and call history.
#[derive(Debug, Clone)]
pub struct MockGateway {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Gateway info to return.
    info: GatewayInfo,
    /// Simulated latency per request.
    delay: Duration,
    /// Conversational requests received.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
    /// One-shot prompts received.
    prompts: Arc<Mutex<Vec<String>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a successful completion.
    Success { content: String, usage: TokenUsage },
    /// Return an error.
    Error(GatewayError),
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockGateway {
    /// Creates a new mock gateway with default settings.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: GatewayInfo::new("mock", "mock-chat-1", "mock-once-1"),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a successful response to the queue.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.with_response_usage(content, TokenUsage::new(10, 20))
    }

    /// Adds a successful response with explicit usage.
    pub fn with_response_usage(self, content: impl Into<String>, usage: TokenUsage) -> Self {
        locked(&self.responses).push_back(MockResponse::Success {
            content: content.into(),
            usage,
        });
        self
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: GatewayError) -> Self {
        locked(&self.responses).push_back(MockResponse::Error(error));
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the gateway info.
    pub fn with_gateway_info(mut self, info: GatewayInfo) -> Self {
        self.info = info;
        self
    }

    /// Queues another response on an existing (possibly shared) mock.
    pub fn push_response(&self, response: MockResponse) {
        locked(&self.responses).push_back(response);
    }

    /// Returns the number of calls made through either capability.
    pub fn call_count(&self) -> usize {
        locked(&self.calls).len() + locked(&self.prompts).len()
    }

    /// Returns all recorded conversational requests.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        locked(&self.calls).clone()
    }

    /// Returns all recorded one-shot prompts.
    pub fn get_prompts(&self) -> Vec<String> {
        locked(&self.prompts).clone()
    }

    /// Clears the call history.
    pub fn clear_calls(&self) {
        locked(&self.calls).clear();
        locked(&self.prompts).clear();
    }

    /// Gets the next response or a default.
    fn next_response(&self) -> MockResponse {
        locked(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Success {
                content: DEFAULT_MOCK_REPLY.to_string(),
                usage: TokenUsage::new(5, 10),
            })
    }

    async fn respond(&self, model: &str) -> Result<CompletionResponse, GatewayError> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_response() {
            MockResponse::Success { content, usage } => {
                Ok(CompletionResponse::new(content, model).with_usage(usage))
            }
            MockResponse::Error(err) => Err(err),
        }
    }
}

#[async_trait]
impl CompletionGateway for MockGateway {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, GatewayError> {
        locked(&self.calls).push(request);
        self.respond(&self.info.chat_model).await
    }

    async fn complete_once(&self, prompt: &str) -> Result<CompletionResponse, GatewayError> {
        locked(&self.prompts).push(prompt.to_string());
        self.respond(&self.info.once_model).await
    }

    fn gateway_info(&self) -> GatewayInfo {
        self.info.clone()
    }
}
