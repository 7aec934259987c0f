//! # optic-client
//!
//! Client library for optic session and collection sync.
//!
//! This is the library that applications use to hold the authentication
//! session and a locally cached, optimistically-mutated view of the remote
//! users collection.
//!
//! ## Features
//!
//! - **Session state machine**: sign-up/sign-in/sign-out driven through the
//!   pure machine in optic-core, with the token mirrored to durable storage
//! - **Optimistic mutations**: create/update/delete apply locally first and
//!   roll back to a pre-mutation snapshot when the remote write fails
//! - **Cancellable read-all**: fetches return a handle that aborts the
//!   outstanding request with no further state mutation
//! - **Transport abstraction**: pluggable transport layer (HTTP, mock)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use optic_client::{HttpTransport, MemoryTokenStore, SessionStore, UserStore};
//!
//! let transport = Arc::new(HttpTransport::new("http://localhost:3000/api/v1")?);
//! let storage = Arc::new(MemoryTokenStore::new());
//! let session = Arc::new(SessionStore::new(transport.clone(), storage)?);
//! let users = Arc::new(UserStore::new(transport, session.subscribe()));
//!
//! let _autofetch = users.bind_session();
//! session.sign_in("a@b.com", "pw").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod error;
pub mod session;
pub mod storage;
pub mod store;
pub mod transport;

pub use classify::{classify, Classified};
pub use error::ClientError;
pub use session::SessionStore;
pub use storage::{FileTokenStore, MemoryTokenStore, StorageError, TokenStore};
pub use store::{FetchHandle, UserStore};
pub use transport::{HttpTransport, HttpTransportConfig, MockTransport, Transport, TransportError};
