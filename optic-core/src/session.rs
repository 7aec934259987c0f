//! Session state machine for optic.
//!
//! This module provides a pure, side-effect-free state machine for the
//! authentication session lifecycle. The state machine takes events as
//! input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (network calls, token persistence) is performed by
//! optic-client, not by this module. This enables instant unit testing
//! without transport or storage mocks.

use std::fmt;

/// Authentication phase - NO I/O, just state transitions.
///
/// `Authenticating` is entered only from `Anonymous` or `Authenticated`
/// (re-auth) and always exits to exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    /// No session; token is empty.
    Anonymous,
    /// An authentication attempt is in flight. Carries the token held when
    /// the attempt started (non-empty during re-auth).
    Authenticating {
        /// Token from before the attempt started.
        token: String,
    },
    /// Authenticated with a non-empty token.
    Authenticated {
        /// The session token.
        token: String,
    },
}

/// Session state machine.
///
/// Completion events carry the attempt number they belong to; a new
/// authentication call supersedes tracking of a previous one, so stale
/// completions are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    phase: Phase,
    error: String,
    is_error: bool,
    attempt: u64,
}

impl SessionState {
    /// Create a new state machine with no session.
    pub fn new() -> Self {
        Self {
            phase: Phase::Anonymous,
            error: String::new(),
            is_error: false,
            attempt: 0,
        }
    }

    /// Create a state machine hydrated from a persisted token.
    ///
    /// An empty token hydrates to `Anonymous`.
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let mut state = Self::new();
        if !token.is_empty() {
            state.phase = Phase::Authenticated { token };
        }
        state
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (optic-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: SessionEvent) -> (Self, Vec<SessionAction>) {
        match event {
            SessionEvent::AuthStarted => {
                let token = self.token().to_string();
                (
                    Self {
                        phase: Phase::Authenticating { token },
                        attempt: self.attempt.wrapping_add(1),
                        ..self
                    },
                    vec![],
                )
            }

            SessionEvent::AuthSucceeded { attempt, token } => {
                if attempt != self.attempt || !matches!(self.phase, Phase::Authenticating { .. }) {
                    // Superseded or out-of-band completion.
                    return (self, vec![]);
                }
                (
                    Self {
                        phase: Phase::Authenticated {
                            token: token.clone(),
                        },
                        error: String::new(),
                        is_error: false,
                        ..self
                    },
                    vec![
                        SessionAction::PersistToken(token),
                        SessionAction::Navigate(Destination::Dashboard),
                    ],
                )
            }

            SessionEvent::AuthFailed { attempt, message } => {
                if attempt != self.attempt || !matches!(self.phase, Phase::Authenticating { .. }) {
                    return (self, vec![]);
                }
                (
                    Self {
                        phase: Phase::Anonymous,
                        error: message,
                        is_error: true,
                        ..self
                    },
                    vec![],
                )
            }

            SessionEvent::SignedOut => (
                Self {
                    phase: Phase::Anonymous,
                    ..self
                },
                vec![
                    SessionAction::ClearStoredToken,
                    SessionAction::Navigate(Destination::SignedOut),
                ],
            ),

            SessionEvent::ErrorCleared => (
                Self {
                    error: String::new(),
                    is_error: false,
                    ..self
                },
                vec![],
            ),
        }
    }

    /// The current token; empty when unauthenticated.
    pub fn token(&self) -> &str {
        match &self.phase {
            Phase::Anonymous => "",
            Phase::Authenticating { token } => token,
            Phase::Authenticated { token } => token,
        }
    }

    /// Whether an authentication attempt is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Authenticating { .. })
    }

    /// Whether the session holds a non-empty token.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase, Phase::Authenticated { .. })
    }

    /// The current attempt number, used to match completion events.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// A read-only view of the session for consumers.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token().to_string(),
            is_loading: self.is_loading(),
            error: self.error.clone(),
            is_error: self.is_error,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// An authentication call (sign-up or sign-in) was issued.
    AuthStarted,
    /// The authentication call returned a token.
    AuthSucceeded {
        /// Attempt number this completion belongs to.
        attempt: u64,
        /// Server-returned session token.
        token: String,
    },
    /// The authentication call failed with a recoverable error.
    AuthFailed {
        /// Attempt number this completion belongs to.
        attempt: u64,
        /// Classified, user-facing message.
        message: String,
    },
    /// The user signed out.
    SignedOut,
    /// The view dismissed the current error message.
    ErrorCleared,
}

/// Actions to be executed by the session store.
///
/// These are instructions, not side effects. The store interprets these
/// and performs the actual persistence and navigation signalling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Mirror the token into durable storage.
    PersistToken(String),
    /// Clear the token from durable storage.
    ClearStoredToken,
    /// Signal the consumer to navigate.
    Navigate(Destination),
}

/// Navigation destinations signalled to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The authenticated landing view.
    Dashboard,
    /// The signed-out view.
    SignedOut,
}

/// Read-only session view exposed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    /// Opaque session token; empty when unauthenticated.
    pub token: String,
    /// Whether an authentication call is in flight.
    pub is_loading: bool,
    /// Current user-facing error message; empty when none.
    pub error: String,
    /// Explicit error flag, distinct from message presence.
    pub is_error: bool,
}

impl SessionSnapshot {
    /// Whether the snapshot holds a non-empty token.
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}

impl fmt::Display for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_authenticated() {
            write!(f, "authenticated")
        } else if self.is_loading {
            write!(f, "authenticating")
        } else {
            write!(f, "anonymous")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_anonymous() {
        let state = SessionState::new();
        assert_eq!(state.token(), "");
        assert!(!state.is_loading());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn hydrates_from_persisted_token() {
        let state = SessionState::with_token("T0");
        assert!(state.is_authenticated());
        assert_eq!(state.token(), "T0");
    }

    #[test]
    fn hydrating_empty_token_stays_anonymous() {
        let state = SessionState::with_token("");
        assert!(!state.is_authenticated());
    }

    #[test]
    fn auth_start_enters_loading() {
        let state = SessionState::new();
        let (state, actions) = state.on_event(SessionEvent::AuthStarted);

        assert!(state.is_loading());
        assert!(actions.is_empty());
    }

    #[test]
    fn auth_success_transitions_to_authenticated() {
        let (state, _) = SessionState::new().on_event(SessionEvent::AuthStarted);
        let attempt = state.attempt();
        let (state, actions) = state.on_event(SessionEvent::AuthSucceeded {
            attempt,
            token: "T1".into(),
        });

        assert!(state.is_authenticated());
        assert_eq!(state.token(), "T1");
        assert!(!state.is_loading());
        assert!(actions
            .iter()
            .any(|a| matches!(a, SessionAction::PersistToken(t) if t == "T1")));
        assert!(actions
            .iter()
            .any(|a| matches!(a, SessionAction::Navigate(Destination::Dashboard))));
    }

    #[test]
    fn auth_success_clears_previous_error() {
        let (state, _) = SessionState::new().on_event(SessionEvent::AuthStarted);
        let attempt = state.attempt();
        let (state, _) = state.on_event(SessionEvent::AuthFailed {
            attempt,
            message: "bad credentials".into(),
        });
        assert!(state.snapshot().is_error);

        let (state, _) = state.on_event(SessionEvent::AuthStarted);
        let attempt = state.attempt();
        let (state, _) = state.on_event(SessionEvent::AuthSucceeded {
            attempt,
            token: "T2".into(),
        });

        let snap = state.snapshot();
        assert_eq!(snap.error, "");
        assert!(!snap.is_error);
    }

    #[test]
    fn auth_failure_returns_to_anonymous() {
        let (state, _) = SessionState::new().on_event(SessionEvent::AuthStarted);
        let attempt = state.attempt();
        let (state, actions) = state.on_event(SessionEvent::AuthFailed {
            attempt,
            message: "invalid password".into(),
        });

        assert_eq!(state.token(), "");
        assert!(!state.is_loading());
        let snap = state.snapshot();
        assert_eq!(snap.error, "invalid password");
        assert!(snap.is_error);
        // Failure never writes durable storage.
        assert!(actions.is_empty());
    }

    #[test]
    fn reauth_failure_clears_token() {
        let state = SessionState::with_token("OLD");
        let (state, _) = state.on_event(SessionEvent::AuthStarted);
        // Token still visible while the re-auth is in flight.
        assert_eq!(state.token(), "OLD");

        let attempt = state.attempt();
        let (state, _) = state.on_event(SessionEvent::AuthFailed {
            attempt,
            message: "expired".into(),
        });
        assert_eq!(state.token(), "");
    }

    #[test]
    fn stale_success_is_ignored() {
        let (state, _) = SessionState::new().on_event(SessionEvent::AuthStarted);
        let stale = state.attempt();
        // A second call supersedes the first.
        let (state, _) = state.on_event(SessionEvent::AuthStarted);

        let (state, actions) = state.on_event(SessionEvent::AuthSucceeded {
            attempt: stale,
            token: "STALE".into(),
        });

        assert!(state.is_loading());
        assert_eq!(state.token(), "");
        assert!(actions.is_empty());
    }

    #[test]
    fn stale_failure_is_ignored() {
        let (state, _) = SessionState::new().on_event(SessionEvent::AuthStarted);
        let stale = state.attempt();
        let (state, _) = state.on_event(SessionEvent::AuthStarted);
        let attempt = state.attempt();

        let (state, _) = state.on_event(SessionEvent::AuthFailed {
            attempt: stale,
            message: "old failure".into(),
        });
        assert!(state.is_loading());
        assert_eq!(state.snapshot().error, "");

        // The current attempt still completes normally.
        let (state, _) = state.on_event(SessionEvent::AuthSucceeded {
            attempt,
            token: "T3".into(),
        });
        assert!(state.is_authenticated());
    }

    #[test]
    fn completion_without_attempt_in_flight_is_ignored() {
        let state = SessionState::new();
        let (state, actions) = state.on_event(SessionEvent::AuthSucceeded {
            attempt: 0,
            token: "T".into(),
        });
        assert!(!state.is_authenticated());
        assert!(actions.is_empty());
    }

    #[test]
    fn sign_out_clears_token_and_storage() {
        let state = SessionState::with_token("T1");
        let (state, actions) = state.on_event(SessionEvent::SignedOut);

        assert_eq!(state.token(), "");
        assert!(actions
            .iter()
            .any(|a| matches!(a, SessionAction::ClearStoredToken)));
        assert!(actions
            .iter()
            .any(|a| matches!(a, SessionAction::Navigate(Destination::SignedOut))));
    }

    #[test]
    fn clear_error_keeps_token() {
        let (state, _) = SessionState::with_token("T1").on_event(SessionEvent::AuthStarted);
        let attempt = state.attempt();
        let (state, _) = state.on_event(SessionEvent::AuthFailed {
            attempt,
            message: "oops".into(),
        });

        let (state, actions) = state.on_event(SessionEvent::ErrorCleared);
        let snap = state.snapshot();
        assert_eq!(snap.error, "");
        assert!(!snap.is_error);
        assert!(actions.is_empty());
    }

    #[test]
    fn snapshot_reflects_state() {
        let state = SessionState::with_token("T9");
        let snap = state.snapshot();
        assert_eq!(snap.token, "T9");
        assert!(snap.is_authenticated());
        assert!(!snap.is_loading);
        assert_eq!(snap.to_string(), "authenticated");
    }
}
