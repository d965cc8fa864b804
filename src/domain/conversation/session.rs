//! Session state machine.
//!
//! A session moves between two phases:
//!
//! ```text
//! Idle --begin_exchange(valid)--> Awaiting --complete_exchange--> Idle
//! ```
//!
//! `begin_exchange` while `Awaiting`, or with blank text, is rejected and
//! leaves the state untouched. Every accepted exchange appends exactly one
//! user turn followed by exactly one assistant turn.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::transcript::Transcript;
use super::turn::Turn;
use crate::domain::foundation::ValidationError;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Ready for the next user message.
    #[default]
    Idle,
    /// A request is in flight; further submissions are refused.
    Awaiting,
}

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("message is empty")]
    EmptyMessage,

    #[error("a reply is still pending")]
    AlreadyPending,
}

/// Everything the gateway needs for one exchange.
///
/// `prior_turns` is captured before the optimistic user append, so the new
/// message never appears twice when the request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub prior_turns: Vec<Turn>,
    pub message: String,
}

/// Transcript plus in-flight flag for one chat surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    transcript: Transcript,
    phase: SessionPhase,
}

impl SessionState {
    /// Creates an idle session seeded with the assistant greeting.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the opening text is blank
    pub fn new(opening_text: impl Into<String>) -> Result<Self, ValidationError> {
        let opening_text = opening_text.into();
        if opening_text.trim().is_empty() {
            return Err(ValidationError::empty_field("opening_text"));
        }

        Ok(Self {
            transcript: Transcript::seeded(opening_text),
            phase: SessionPhase::Idle,
        })
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase == SessionPhase::Awaiting
    }

    /// Accepts a user message and moves to `Awaiting`.
    ///
    /// The trimmed text is appended as a user turn immediately. The returned
    /// exchange carries the history as it was before that append, limited to
    /// the most recent `history_window` turns when a window is given.
    pub fn begin_exchange(
        &mut self,
        user_text: &str,
        history_window: Option<usize>,
    ) -> Result<PendingExchange, RejectReason> {
        if self.is_pending() {
            return Err(RejectReason::AlreadyPending);
        }
        let message = user_text.trim();
        if message.is_empty() {
            return Err(RejectReason::EmptyMessage);
        }

        let prior_turns = self.transcript.recent(history_window).to_vec();
        self.transcript.push(Turn::user(message));
        self.phase = SessionPhase::Awaiting;

        Ok(PendingExchange {
            prior_turns,
            message: message.to_string(),
        })
    }

    /// Appends the assistant turn for the in-flight exchange and returns to
    /// `Idle`.
    ///
    /// Returns `None` without touching the transcript if nothing was pending.
    pub fn complete_exchange(&mut self, assistant_text: impl Into<String>) -> Option<Turn> {
        if !self.is_pending() {
            return None;
        }

        let turn = Turn::assistant(assistant_text);
        self.transcript.push(turn.clone());
        self.phase = SessionPhase::Idle;
        Some(turn)
    }
}
