//! Conversation domain.
//!
//! Turns, transcripts and the single-flight session state machine. Everything
//! here is synchronous; the async exchange with a gateway lives in the
//! application layer.

mod session;
mod transcript;
mod turn;

pub use session::{PendingExchange, RejectReason, SessionPhase, SessionState};
pub use transcript::Transcript;
pub use turn::{Turn, TurnRole};
