//! ConversationSession - one chat surface's transcript and its exchanges with
//! the completion gateway.
//!
//! `submit` is the only way to mutate a session:
//!
//! 1. Reject blank text or a submission while a reply is pending (no-op).
//! 2. Append the trimmed user turn and mark the session pending.
//! 3. Ask the gateway, bounded by the exchange timeout.
//! 4. Append the reply, or the fallback text on any failure, and go idle.
//!
//! Failures never reach the caller as errors. They show up as an ordinary
//! assistant turn carrying the fallback text.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::studio::{SurfaceProfile, CHAT_FALLBACK};
use crate::domain::conversation::{RejectReason, SessionPhase, SessionState, Transcript, Turn};
use crate::domain::foundation::{SessionId, ValidationError};
use crate::ports::{CompletionGateway, CompletionRequest, GatewayError, GenerationParams};

/// Default bound on a single gateway exchange.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(120);

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing changed.
    Rejected(RejectReason),
    /// The gateway replied; this turn was appended.
    Replied(Turn),
    /// The gateway failed; this fallback turn was appended.
    Fallback(Turn),
}

impl SubmitOutcome {
    /// The appended assistant turn, if any.
    pub fn turn(&self) -> Option<&Turn> {
        match self {
            SubmitOutcome::Rejected(_) => None,
            SubmitOutcome::Replied(turn) | SubmitOutcome::Fallback(turn) => Some(turn),
        }
    }
}

/// Point-in-time copy of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub transcript: Transcript,
    pub pending: bool,
}

/// A conversation bound to one gateway.
///
/// Safe to share behind an `Arc`: state sits in a mutex that is never held
/// across an await, and the single-flight gate is checked under that lock.
pub struct ConversationSession {
    id: SessionId,
    state: Mutex<SessionState>,
    gateway: Arc<dyn CompletionGateway>,
    system_preamble: Option<String>,
    params: GenerationParams,
    fallback_text: String,
    exchange_timeout: Duration,
    history_window: Option<usize>,
}

impl ConversationSession {
    /// Creates a session seeded with `opening_text`.
    ///
    /// No preamble and no generation parameters are set; the chat fallback is
    /// used on failure.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the opening text is blank
    pub fn initialize(
        opening_text: impl Into<String>,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Result<Self, ValidationError> {
        let session = Self {
            id: SessionId::new(),
            state: Mutex::new(SessionState::new(opening_text)?),
            gateway,
            system_preamble: None,
            params: GenerationParams::default(),
            fallback_text: CHAT_FALLBACK.to_string(),
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            history_window: None,
        };
        info!(session_id = %session.id, "Conversation session initialized");
        Ok(session)
    }

    /// Creates a session configured for a chat surface.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the profile's opening text is blank
    pub fn for_surface(
        profile: SurfaceProfile,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Result<Self, ValidationError> {
        let mut session = Self::initialize(profile.opening_text, gateway)?
            .with_params(profile.params)
            .with_fallback_text(profile.fallback_text);
        if let Some(preamble) = profile.system_preamble {
            session = session.with_system_preamble(preamble);
        }
        debug!(session_id = %session.id, surface = %profile.surface, "Session bound to surface");
        Ok(session)
    }

    /// Sets the system preamble sent with every exchange.
    pub fn with_system_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.system_preamble = Some(preamble.into());
        self
    }

    /// Sets the generation parameters.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Sets the text appended when an exchange fails.
    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = text.into();
        self
    }

    /// Sets the bound on a single gateway exchange.
    pub fn with_exchange_timeout(mut self, exchange_timeout: Duration) -> Self {
        self.exchange_timeout = exchange_timeout;
        self
    }

    /// Limits how many prior turns are sent to the gateway.
    ///
    /// The full transcript is always kept for display.
    pub fn with_history_window(mut self, window: Option<usize>) -> Self {
        self.history_window = window;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_pending(&self) -> bool {
        self.lock_state().is_pending()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase()
    }

    /// Copy of the current transcript.
    pub fn transcript(&self) -> Transcript {
        self.lock_state().transcript().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            id: self.id,
            transcript: state.transcript().clone(),
            pending: state.is_pending(),
        }
    }

    /// Submits a user message and waits for the next assistant turn.
    ///
    /// The user turn is visible in snapshots as soon as this future is first
    /// polled. Dropping the future before it resolves appends the fallback
    /// turn, so the session never stays pending.
    pub async fn submit(&self, user_text: &str) -> SubmitOutcome {
        let exchange = {
            let mut state = self.lock_state();
            match state.begin_exchange(user_text, self.history_window) {
                Ok(exchange) => exchange,
                Err(reason) => {
                    debug!(session_id = %self.id, %reason, "Submission rejected");
                    return SubmitOutcome::Rejected(reason);
                }
            }
        };

        let guard = ExchangeGuard {
            session: self,
            armed: true,
        };

        let mut request = CompletionRequest::from_exchange(exchange).with_params(self.params);
        if let Some(preamble) = &self.system_preamble {
            request = request.with_system_preamble(preamble.clone());
        }
        debug!(
            session_id = %self.id,
            prior_turns = request.prior_turns.len(),
            "Requesting completion"
        );

        match self.request_reply(request).await {
            Ok(text) => {
                info!(session_id = %self.id, "Assistant replied");
                SubmitOutcome::Replied(guard.resolve(text))
            }
            Err(err) => {
                warn!(session_id = %self.id, error = %err, "Exchange failed, using fallback");
                SubmitOutcome::Fallback(guard.resolve(self.fallback_text.clone()))
            }
        }
    }

    /// One bounded gateway call. Every failure mode collapses to an error.
    async fn request_reply(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        let response = timeout(self.exchange_timeout, self.gateway.complete(request))
            .await
            .map_err(|_| GatewayError::Timeout {
                timeout_secs: self.exchange_timeout.as_secs(),
            })??;

        if response.content.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }

        debug!(
            session_id = %self.id,
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "Completion received"
        );
        Ok(response.content)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Closes the in-flight exchange exactly once.
///
/// If the submit future is dropped mid-flight, `Drop` appends the fallback
/// turn so the session returns to idle.
struct ExchangeGuard<'a> {
    session: &'a ConversationSession,
    armed: bool,
}

impl ExchangeGuard<'_> {
    fn resolve(mut self, text: String) -> Turn {
        self.armed = false;
        self.session
            .lock_state()
            .complete_exchange(text.clone())
            .unwrap_or_else(|| Turn::assistant(text))
    }
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(session_id = %self.session.id, "Exchange abandoned, using fallback");
            self.session
                .lock_state()
                .complete_exchange(self.session.fallback_text.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockGateway;
    use crate::application::studio::{CONSULTANT_PREAMBLE, WIDGET_OPENING};
    use crate::domain::conversation::TurnRole;

    fn session_with(gateway: &MockGateway) -> ConversationSession {
        ConversationSession::initialize("Hi", Arc::new(gateway.clone())).unwrap()
    }

    #[tokio::test]
    async fn initialize_seeds_single_assistant_turn() {
        let session = session_with(&MockGateway::new());
        let snapshot = session.snapshot();

        assert_eq!(snapshot.transcript.len(), 1);
        assert_eq!(snapshot.transcript[0], Turn::assistant("Hi"));
        assert!(!snapshot.pending);
        assert_eq!(snapshot.id, session.id());
    }

    #[test]
    fn initialize_rejects_blank_opening() {
        let result = ConversationSession::initialize("   ", Arc::new(MockGateway::new()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn successful_submit_appends_user_and_reply() {
        let gateway = MockGateway::new().with_response("B");
        let session = session_with(&gateway);

        let outcome = session.submit("A").await;

        assert_eq!(outcome, SubmitOutcome::Replied(Turn::assistant("B")));
        assert_eq!(
            session.transcript().to_vec(),
            vec![Turn::assistant("Hi"), Turn::user("A"), Turn::assistant("B")]
        );
        assert!(!session.is_pending());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn submit_trims_user_text() {
        let gateway = MockGateway::new();
        let session = session_with(&gateway);

        session.submit("  hello \n").await;

        assert_eq!(session.transcript()[1], Turn::user("hello"));
        assert_eq!(gateway.get_calls()[0].new_message, "hello");
    }

    #[tokio::test]
    async fn blank_submit_is_a_no_op() {
        let gateway = MockGateway::new();
        let session = session_with(&gateway);
        let before = session.snapshot();

        assert_eq!(
            session.submit("").await,
            SubmitOutcome::Rejected(RejectReason::EmptyMessage)
        );
        assert_eq!(
            session.submit("   ").await,
            SubmitOutcome::Rejected(RejectReason::EmptyMessage)
        );
        assert_eq!(session.snapshot(), before);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn network_error_appends_fallback() {
        let gateway = MockGateway::new().with_error(GatewayError::network("offline"));
        let session = session_with(&gateway);

        let outcome = session.submit("A").await;

        assert_eq!(outcome, SubmitOutcome::Fallback(Turn::assistant(CHAT_FALLBACK)));
        assert_eq!(session.transcript().last(), Some(&Turn::assistant(CHAT_FALLBACK)));
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn empty_reply_appends_fallback() {
        let gateway = MockGateway::new().with_response("   ");
        let session = session_with(&gateway);

        let outcome = session.submit("A").await;

        assert_eq!(outcome, SubmitOutcome::Fallback(Turn::assistant(CHAT_FALLBACK)));
    }

    #[tokio::test]
    async fn slow_gateway_times_out_to_fallback() {
        let gateway = MockGateway::new()
            .with_response("too late")
            .with_delay(Duration::from_secs(30));
        let session = session_with(&gateway).with_exchange_timeout(Duration::from_millis(20));

        let outcome = session.submit("A").await;

        assert_eq!(outcome, SubmitOutcome::Fallback(Turn::assistant(CHAT_FALLBACK)));
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn custom_fallback_text_is_used() {
        let gateway = MockGateway::new().with_error(GatewayError::EmptyResponse);
        let session = session_with(&gateway).with_fallback_text("Try again later.");

        let outcome = session.submit("A").await;

        assert_eq!(outcome.turn(), Some(&Turn::assistant("Try again later.")));
    }

    #[tokio::test]
    async fn request_is_built_from_pre_append_history() {
        let gateway = MockGateway::new().with_response("B").with_response("D");
        let session = session_with(&gateway);

        session.submit("A").await;
        session.submit("C").await;

        let calls = gateway.get_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].prior_turns,
            vec![Turn::assistant("Hi"), Turn::user("A"), Turn::assistant("B")]
        );
        assert_eq!(calls[1].new_message, "C");
        assert_eq!(calls[1].ordered_turns().len(), 4);
    }

    #[tokio::test]
    async fn history_window_caps_request_not_transcript() {
        let gateway = MockGateway::new();
        let session = session_with(&gateway).with_history_window(Some(1));

        session.submit("A").await;
        session.submit("C").await;

        let calls = gateway.get_calls();
        assert_eq!(calls[1].prior_turns.len(), 1);
        assert_eq!(calls[1].prior_turns[0].role(), TurnRole::Assistant);
        assert_eq!(session.transcript().len(), 5);
    }

    #[tokio::test]
    async fn surface_session_sends_preamble_and_params() {
        let gateway = MockGateway::new();
        let session =
            ConversationSession::for_surface(SurfaceProfile::widget(), Arc::new(gateway.clone()))
                .unwrap();

        session.submit("I need a reel edited").await;

        let call = &gateway.get_calls()[0];
        assert_eq!(call.system_preamble.as_deref(), Some(CONSULTANT_PREAMBLE));
        assert_eq!(call.params.temperature, Some(0.7));
        assert_eq!(call.params.thinking_budget, Some(32768));
        assert_eq!(call.prior_turns, vec![Turn::assistant(WIDGET_OPENING)]);
    }

    #[tokio::test]
    async fn plain_session_sends_no_preamble() {
        let gateway = MockGateway::new();
        let session = session_with(&gateway);

        session.submit("A").await;

        assert!(gateway.get_calls()[0].system_preamble.is_none());
    }

    #[tokio::test]
    async fn custom_preamble_is_sent_out_of_band() {
        let gateway = MockGateway::new();
        let session = session_with(&gateway).with_system_preamble("Answer in one line.");

        session.submit("A").await;

        let call = &gateway.get_calls()[0];
        assert_eq!(call.system_preamble.as_deref(), Some("Answer in one line."));
        assert_eq!(call.ordered_turns(), vec![Turn::assistant("Hi"), Turn::user("A")]);
    }

    #[tokio::test]
    async fn submit_while_pending_is_rejected() {
        let gateway = MockGateway::new()
            .with_response("first reply")
            .with_delay(Duration::from_millis(50));
        let session = session_with(&gateway);

        let (first, second) = tokio::join!(session.submit("first"), async {
            // Runs after `first` has been polled once and is awaiting the gateway.
            let during = session.snapshot();
            (session.submit("second").await, during)
        });
        let (second, during) = second;

        assert!(during.pending);
        assert_eq!(during.transcript.last(), Some(&Turn::user("first")));
        assert_eq!(second, SubmitOutcome::Rejected(RejectReason::AlreadyPending));
        assert_eq!(first, SubmitOutcome::Replied(Turn::assistant("first reply")));
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn dropped_submit_releases_the_session() {
        let gateway = MockGateway::new().with_delay(Duration::from_secs(30));
        let session = session_with(&gateway);

        let result =
            tokio::time::timeout(Duration::from_millis(20), session.submit("A")).await;

        assert!(result.is_err());
        assert!(!session.is_pending());
        assert_eq!(
            session.transcript().to_vec(),
            vec![
                Turn::assistant("Hi"),
                Turn::user("A"),
                Turn::assistant(CHAT_FALLBACK)
            ]
        );
    }
}
