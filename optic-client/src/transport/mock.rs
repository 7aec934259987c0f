//! Mock transport for testing.
//!
//! Allows queueing responses, forcing failures, and capturing issued
//! requests for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use optic_types::{AuthRequest, AuthResponse, User, UserId};

/// Mock transport for testing.
///
/// Allows queueing responses, forcing failures, and capturing issued
/// requests for verification. Clones share state.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    auth_results: VecDeque<Result<AuthResponse, TransportError>>,
    list_results: VecDeque<Result<Vec<User>, TransportError>>,
    stall_next_list: bool,
    fail_next_create: Option<TransportError>,
    fail_next_update: Option<TransportError>,
    fail_next_delete: Option<TransportError>,
    next_create_id: Option<UserId>,
    auth_requests: Vec<AuthRequest>,
    list_tokens: Vec<String>,
    created: Vec<User>,
    updated: Vec<User>,
    deleted: Vec<User>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful auth response with the given token.
    pub fn queue_token(&self, token: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.auth_results.push_back(Ok(AuthResponse {
            token: token.to_string(),
            message: String::new(),
        }));
    }

    /// Cause the next sign-up/sign-in to fail with the given error.
    pub fn fail_next_auth(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.auth_results.push_back(Err(error));
    }

    /// Queue a list response with the given users.
    pub fn queue_users(&self, users: Vec<User>) {
        let mut inner = self.inner.lock().unwrap();
        inner.list_results.push_back(Ok(users));
    }

    /// Cause the next list to fail with the given error.
    pub fn fail_next_list(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.list_results.push_back(Err(error));
    }

    /// Make the next list call pend forever, so a caller can cancel it.
    pub fn stall_next_list(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.stall_next_list = true;
    }

    /// Cause the next create to fail with the given error.
    pub fn fail_next_create(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_create = Some(error);
    }

    /// Cause the next update to fail with the given error.
    pub fn fail_next_update(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_update = Some(error);
    }

    /// Cause the next delete to fail with the given error.
    pub fn fail_next_delete(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_delete = Some(error);
    }

    /// Echo the next created entity with this server-assigned identifier.
    pub fn assign_next_create_id(&self, id: UserId) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_create_id = Some(id);
    }

    /// Auth request bodies that were issued.
    pub fn auth_requests(&self) -> Vec<AuthRequest> {
        self.inner.lock().unwrap().auth_requests.clone()
    }

    /// Tokens presented on list calls.
    pub fn list_tokens(&self) -> Vec<String> {
        self.inner.lock().unwrap().list_tokens.clone()
    }

    /// Number of list calls issued (including stalled ones).
    pub fn list_calls(&self) -> usize {
        self.inner.lock().unwrap().list_tokens.len()
    }

    /// Entities sent to create.
    pub fn created_users(&self) -> Vec<User> {
        self.inner.lock().unwrap().created.clone()
    }

    /// Entities sent to update.
    pub fn updated_users(&self) -> Vec<User> {
        self.inner.lock().unwrap().updated.clone()
    }

    /// Entities sent to delete.
    pub fn deleted_users(&self) -> Vec<User> {
        self.inner.lock().unwrap().deleted.clone()
    }

    /// Clear all state (queues, forced failures, recorded requests).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn sign_up(&self, request: &AuthRequest) -> Result<AuthResponse, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.auth_requests.push(request.clone());
        inner
            .auth_results
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("mock: no queued auth response".into())))
    }

    async fn sign_in(&self, request: &AuthRequest) -> Result<AuthResponse, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.auth_requests.push(request.clone());
        inner
            .auth_results
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("mock: no queued auth response".into())))
    }

    async fn list_users(&self, token: &str) -> Result<Vec<User>, TransportError> {
        let stalled = {
            let mut inner = self.inner.lock().unwrap();
            inner.list_tokens.push(token.to_string());
            std::mem::take(&mut inner.stall_next_list)
        };
        if stalled {
            // Pends until the caller drops the future (cancellation).
            std::future::pending::<()>().await;
        }
        let mut inner = self.inner.lock().unwrap();
        inner
            .list_results
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("mock: no queued list response".into())))
    }

    async fn create_user(&self, user: &User) -> Result<User, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.created.push(user.clone());
        if let Some(error) = inner.fail_next_create.take() {
            return Err(error);
        }
        let mut stored = user.clone();
        if let Some(id) = inner.next_create_id.take() {
            stored.id = id;
        }
        Ok(stored)
    }

    async fn update_user(&self, user: &User) -> Result<User, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.updated.push(user.clone());
        if let Some(error) = inner.fail_next_update.take() {
            return Err(error);
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, user: &User) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.deleted.push(user.clone());
        if let Some(error) = inner.fail_next_delete.take() {
            return Err(error);
        }
        Ok(())
    }
}
