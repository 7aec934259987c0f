//! SessionStore - owns the authentication session.
//!
//! The store drives the pure state machine from optic-core and interprets
//! the actions it produces: persisting the token to durable storage,
//! clearing it on sign-out, and signalling navigation to the caller.
//! Consumers observe the session through a watch channel of snapshots.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use optic_core::{Destination, SessionAction, SessionEvent, SessionSnapshot, SessionState};
use optic_types::AuthRequest;

use crate::classify::{classify, Classified};
use crate::error::ClientError;
use crate::storage::TokenStore;
use crate::transport::Transport;

/// The authentication session store.
///
/// Application-lifetime value, shared via `Arc`. Hydrates the token from
/// durable storage at construction; mirrors it back on every successful
/// authentication and clears it on sign-out.
pub struct SessionStore<T: Transport> {
    transport: Arc<T>,
    storage: Arc<dyn TokenStore>,
    state: Mutex<SessionState>,
    changes: watch::Sender<SessionSnapshot>,
}

impl<T: Transport> SessionStore<T> {
    /// Create a session store, hydrating the token from durable storage.
    pub fn new(transport: Arc<T>, storage: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        let token = storage.load()?.unwrap_or_default();
        let state = SessionState::with_token(token);
        let (changes, _) = watch::channel(state.snapshot());
        Ok(Self {
            transport,
            storage,
            state: Mutex::new(state),
            changes,
        })
    }

    /// Subscribe to session snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.changes.subscribe()
    }

    /// The current session snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.changes.borrow().clone()
    }

    /// Create an account and start a session.
    ///
    /// Returns the destination to navigate to on success, `None` when the
    /// failure was absorbed into the session's error state.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Destination>, ClientError> {
        self.authenticate(AuthKind::SignUp, email, password).await
    }

    /// Exchange credentials for a session.
    ///
    /// Returns the destination to navigate to on success, `None` when the
    /// failure was absorbed into the session's error state.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Destination>, ClientError> {
        self.authenticate(AuthKind::SignIn, email, password).await
    }

    /// End the session: clear the token and durable storage. No network
    /// call is made.
    pub async fn sign_out(&self) -> Result<Destination, ClientError> {
        let (destination, _) = self.apply(SessionEvent::SignedOut).await?;
        Ok(destination.unwrap_or(Destination::SignedOut))
    }

    /// Dismiss the current error message without touching the token.
    pub async fn clear_error(&self) -> Result<(), ClientError> {
        self.apply(SessionEvent::ErrorCleared).await?;
        Ok(())
    }

    async fn authenticate(
        &self,
        kind: AuthKind,
        email: &str,
        password: &str,
    ) -> Result<Option<Destination>, ClientError> {
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::EmptyCredentials);
        }

        let (_, attempt) = self.apply(SessionEvent::AuthStarted).await?;

        let request = AuthRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = match kind {
            AuthKind::SignUp => self.transport.sign_up(&request).await,
            AuthKind::SignIn => self.transport.sign_in(&request).await,
        };

        match result {
            Ok(response) => {
                tracing::debug!(kind = kind.as_str(), "authentication succeeded");
                let (destination, _) = self
                    .apply(SessionEvent::AuthSucceeded {
                        attempt,
                        token: response.token,
                    })
                    .await?;
                Ok(destination)
            }
            Err(err) => match classify(err)? {
                Classified::Cancelled => Ok(None),
                Classified::Recoverable(message) => {
                    tracing::warn!(kind = kind.as_str(), error = %message, "authentication failed");
                    self.apply(SessionEvent::AuthFailed { attempt, message })
                        .await?;
                    Ok(None)
                }
            },
        }
    }

    /// Feed an event through the machine, publish the new snapshot, and
    /// execute the produced actions. The token is mirrored to durable
    /// storage before this returns, so the mirror stays synchronous with
    /// the state change.
    async fn apply(
        &self,
        event: SessionEvent,
    ) -> Result<(Option<Destination>, u64), ClientError> {
        let (snapshot, actions, attempt) = {
            let mut state = self.state.lock().await;
            let (next, actions) = state.clone().on_event(event);
            *state = next;
            (state.snapshot(), actions, state.attempt())
        };

        let mut destination = None;
        for action in actions {
            match action {
                SessionAction::PersistToken(token) => self.storage.save(&token)?,
                SessionAction::ClearStoredToken => self.storage.clear()?,
                SessionAction::Navigate(dest) => destination = Some(dest),
            }
        }

        self.changes.send_replace(snapshot);
        Ok((destination, attempt))
    }
}

#[derive(Debug, Clone, Copy)]
enum AuthKind {
    SignUp,
    SignIn,
}

impl AuthKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::SignUp => "sign-up",
            Self::SignIn => "sign-in",
        }
    }
}
