//! DescriptionEnhancer - one-shot rewrite of a portfolio video description.
//!
//! Stateless apart from an in-flight flag that a form can use to disable its
//! "enhance" button. Failures produce a fixed fallback string, never an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::studio::{enhancement_prompt, ENHANCE_FALLBACK};
use crate::ports::{CompletionGateway, GatewayError};

/// Default bound on a single enhancement call.
pub const DEFAULT_ENHANCE_TIMEOUT: Duration = Duration::from_secs(60);

/// Polishes raw description text through the gateway's one-shot capability.
pub struct DescriptionEnhancer {
    gateway: Arc<dyn CompletionGateway>,
    in_flight: AtomicBool,
    fallback_text: String,
    request_timeout: Duration,
}

impl DescriptionEnhancer {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            gateway,
            in_flight: AtomicBool::new(false),
            fallback_text: ENHANCE_FALLBACK.to_string(),
            request_timeout: DEFAULT_ENHANCE_TIMEOUT,
        }
    }

    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = text.into();
        self
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// True while an enhancement call is outstanding.
    pub fn is_enhancing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Returns enhanced text, or the fallback text if the call fails.
    ///
    /// Returns `None` without calling the gateway when `raw_text` is blank or
    /// another enhancement is already running.
    pub async fn enhance(&self, raw_text: &str) -> Option<String> {
        if raw_text.trim().is_empty() {
            debug!("Enhancement skipped, description is blank");
            return None;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Enhancement skipped, another call is in flight");
            return None;
        }
        let _flight = InFlight(&self.in_flight);

        let prompt = enhancement_prompt(raw_text);
        match self.request(&prompt).await {
            Ok(text) => {
                info!(chars = text.len(), "Description enhanced");
                Some(text)
            }
            Err(err) => {
                warn!(error = %err, "Enhancement failed, using fallback");
                Some(self.fallback_text.clone())
            }
        }
    }

    async fn request(&self, prompt: &str) -> Result<String, GatewayError> {
        let response = timeout(self.request_timeout, self.gateway.complete_once(prompt))
            .await
            .map_err(|_| GatewayError::Timeout {
                timeout_secs: self.request_timeout.as_secs(),
            })??;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

/// Clears the in-flight flag on every exit path, including cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
