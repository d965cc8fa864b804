//! Turn value object.
//!
//! A turn is one immutable entry in a conversation transcript: who spoke and
//! what they said.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Visitor typing into a chat surface.
    User,
    /// Studio agent (model reply, greeting, or fallback).
    Assistant,
}

impl TurnRole {
    /// The role expected to speak after this one.
    pub fn next(self) -> Self {
        match self {
            TurnRole::User => TurnRole::Assistant,
            TurnRole::Assistant => TurnRole::User,
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a transcript.
///
/// Fields are private so a turn cannot be edited after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: TurnRole,
    text: String,
}

impl Turn {
    /// Creates a turn with the given role and text.
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    /// Creates a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text)
    }

    /// Creates an assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, text)
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == TurnRole::Assistant
    }
}
