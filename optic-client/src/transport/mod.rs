//! Transport abstraction for optic.
//!
//! This module provides a pluggable transport layer that abstracts the
//! remote API (HTTP against the real backend, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and request/response oriented:
//! - `sign_up()` / `sign_in()` exchange credentials for a token
//! - `list_users()` reads the whole collection (cancellable by dropping
//!   the future — the stores race it against a cancellation token)
//! - `create_user()` / `update_user()` echo the stored entity
//! - `delete_user()` removes an entity
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_token("T1");
//! let resp = transport.sign_in(&request).await?;
//! ```

mod http;
mod mock;

pub use http::{HttpTransport, HttpTransportConfig};
pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;

use optic_types::{AuthRequest, AuthResponse, User};

/// Transport errors.
///
/// The first three variants form the recognized taxonomy the stores
/// recover from; anything else is re-raised by the classifier.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request was cancelled before it resolved. Never surfaced as an
    /// error to consumers.
    #[error("request cancelled")]
    Cancelled,

    /// The server rejected the request, possibly with a structured
    /// `{message}` body.
    #[error("server rejected request ({status})")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Message extracted from a structured error body, when present.
        message: Option<String>,
        /// Raw response body, used as a fallback message.
        body: String,
    },

    /// The request never reached the server (connection refused, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered success but the body violated the contract.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

/// Transport trait for the remote session and collection API.
///
/// Implementations handle the underlying request mechanism (HTTP, mock).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Create an account and return a session token.
    async fn sign_up(&self, request: &AuthRequest) -> Result<AuthResponse, TransportError>;

    /// Exchange credentials for a session token.
    async fn sign_in(&self, request: &AuthRequest) -> Result<AuthResponse, TransportError>;

    /// Read the whole collection, in server order.
    ///
    /// Dropping the returned future aborts the underlying request without
    /// side effects on the caller's state.
    async fn list_users(&self, token: &str) -> Result<Vec<User>, TransportError>;

    /// Store a new entity; the response echoes it with the server-assigned
    /// identifier.
    async fn create_user(&self, user: &User) -> Result<User, TransportError>;

    /// Replace an existing entity; the response echoes the stored value.
    async fn update_user(&self, user: &User) -> Result<User, TransportError>;

    /// Remove an entity by identifier.
    async fn delete_user(&self, user: &User) -> Result<(), TransportError>;
}
