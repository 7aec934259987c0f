//! # optic-types
//!
//! Wire format and entity types for the optic client-side sync layer.
//!
//! This crate provides the foundational types used across all optic crates:
//! - [`UserId`] - Server-assigned entity identity (with client placeholders)
//! - [`User`], [`Location`] - The synced resource entity
//! - [`AuthRequest`], [`AuthResponse`], [`ErrorBody`] - Remote API bodies

#![warn(missing_docs)]
#![warn(clippy::all)]

mod ids;
mod messages;
mod user;

pub use ids::UserId;
pub use messages::{AuthRequest, AuthResponse, ErrorBody};
pub use user::{Location, User};
