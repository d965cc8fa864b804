//! Append-only transcript of turns.

use serde::{Deserialize, Serialize};
use std::ops::Deref;

use super::turn::{Turn, TurnRole};

/// Ordered, append-only history of a conversation.
///
/// There is no removal or edit operation. Appending is crate-private so only
/// the session state machine can grow a transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Turn>);

impl Transcript {
    /// Creates a transcript seeded with the assistant greeting.
    pub fn seeded(opening_text: impl Into<String>) -> Self {
        Self(vec![Turn::assistant(opening_text)])
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.0.push(turn);
    }

    /// The last `limit` turns, or the whole transcript when `limit` is `None`.
    pub fn recent(&self, limit: Option<usize>) -> &[Turn] {
        match limit {
            Some(n) if n < self.0.len() => &self.0[self.0.len() - n..],
            _ => &self.0,
        }
    }

    /// True when roles alternate starting from the assistant greeting.
    pub fn alternates(&self) -> bool {
        let mut expected = TurnRole::Assistant;
        for turn in &self.0 {
            if turn.role() != expected {
                return false;
            }
            expected = expected.next();
        }
        true
    }
}

impl Deref for Transcript {
    type Target = [Turn];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
