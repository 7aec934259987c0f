//! The synced resource entity.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Geographic location attached to a user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// City name.
    pub city: String,
    /// Country name.
    pub country: String,
}

/// A user entity in the remote collection.
///
/// Identity is immutable: once the server assigns `id`, updates replace
/// every other field but never the identifier. Field names follow the
/// remote API's camelCase JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-assigned identifier (or a client placeholder pre-create).
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Self-reported gender.
    pub gender: String,
    /// Geographic location.
    pub location: Location,
    /// Profile picture URL.
    pub picture_url: String,
}

impl User {
    /// Full display name, first then last.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
