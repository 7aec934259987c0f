//! Remote API request and response bodies.
//!
//! These are the JSON payloads exchanged with the authentication and
//! collection endpoints.

use serde::{Deserialize, Serialize};

/// Body of a sign-up or sign-in request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Response to a successful authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Opaque session token.
    pub token: String,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
}

/// Structured error body returned by the remote API on failure.
///
/// Servers are not guaranteed to return this shape; callers fall back to
/// the raw body when the message field is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Server-supplied error message.
    pub message: String,
}
