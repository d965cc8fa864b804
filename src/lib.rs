//! Studio Consultant - conversational assistant for a video editing studio.
//!
//! This crate implements the studio's chat surfaces (a floating widget and a
//! full-page panel) and the portfolio description enhancer, both backed by a
//! text-generation provider reached through the `CompletionGateway` port.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
