//! Error types for the optic client.

use thiserror::Error;

use crate::storage::StorageError;
use crate::transport::TransportError;

/// Errors that escape the stores.
///
/// Recoverable transport failures (structured remote errors, network
/// failures) are absorbed into store state and never surface here; what
/// remains signals a caller bug or a violated remote contract.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport returned an error outside the recognized taxonomy.
    /// Not recovered locally; callers must treat this as a programming or
    /// contract error.
    #[error("transport contract violated: {0}")]
    Contract(#[source] TransportError),

    /// A gated operation was invoked without an authenticated session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Sign-up/sign-in called with an empty email or password.
    #[error("email and password must be non-empty")]
    EmptyCredentials,

    /// Durable token storage failed.
    #[error("token storage error: {0}")]
    Storage(#[from] StorageError),
}
