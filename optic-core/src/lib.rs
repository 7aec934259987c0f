//! # optic-core
//!
//! Pure logic for optic client-side sync (no I/O, instant tests).
//!
//! This crate implements the session state machine and the optimistic
//! collection without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce
//! output without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (network, token storage) is performed by `optic-client`,
//! which interprets the actions produced by the session state machine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod session;

pub use collection::{CollectionSnapshot, OptimisticCollection, Snapshot};
pub use session::{Destination, SessionAction, SessionEvent, SessionSnapshot, SessionState};
