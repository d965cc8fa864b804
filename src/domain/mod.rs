//! Domain layer containing conversation types and rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, validation errors)
//! - `conversation` - Turns, transcripts and the single-flight session state

pub mod conversation;
pub mod foundation;
