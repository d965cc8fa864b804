//! Application layer - use cases that coordinate the domain and ports.
//!
//! - `ConversationSession` - one chat surface talking to the gateway
//! - `DescriptionEnhancer` - one-shot rewrite of portfolio descriptions
//! - `studio` - the studio's fixed prompts, openings and fallbacks

mod conversation_session;
mod description_enhancer;
pub mod studio;

pub use conversation_session::{
    ConversationSession, SessionSnapshot, SubmitOutcome, DEFAULT_EXCHANGE_TIMEOUT,
};
pub use description_enhancer::{DescriptionEnhancer, DEFAULT_ENHANCE_TIMEOUT};
pub use studio::{Surface, SurfaceProfile};
