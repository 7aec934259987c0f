//! Entity identity for optic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix marking an identifier that was minted locally for an optimistic
/// insert and not yet confirmed by the server.
const PLACEHOLDER_PREFIX: &str = "local-";

/// A unique identifier for a user entity.
///
/// Identifiers are assigned by the remote collection and are opaque to the
/// client; once assigned they never change. Optimistic creates carry a
/// client-minted placeholder until the server echoes the stored entity.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a server-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a placeholder identifier for an optimistic insert.
    ///
    /// Placeholders are replaced by the server-assigned identifier when the
    /// create write is acknowledged.
    pub fn placeholder() -> Self {
        Self(format!("{PLACEHOLDER_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    /// Whether this identifier is a client-minted placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_PREFIX)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
