//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Completion gateways (Gemini, mock)

pub mod ai;

pub use ai::{GeminiConfig, GeminiGateway, MockGateway, MockResponse};
