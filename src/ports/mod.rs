//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `CompletionGateway` - Port for the text-generation provider

mod completion_gateway;

pub use completion_gateway::{
    CompletionGateway, CompletionRequest, CompletionResponse, GatewayError, GatewayInfo,
    GenerationParams, TokenUsage,
};
