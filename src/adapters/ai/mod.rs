//! Completion Gateway Adapters.
//!
//! Implementations of the CompletionGateway port.
//!
//! ## Available Adapters
//!
//! - `GeminiGateway` - Google Gemini `generateContent` API
//! - `MockGateway` - Configurable mock for testing

mod gemini_gateway;
mod mock_gateway;

pub use gemini_gateway::{
    GeminiConfig, GeminiGateway, DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_ONCE_MODEL,
};
pub use mock_gateway::{MockGateway, MockResponse, DEFAULT_MOCK_REPLY};
