//! UserStore - the cached, optimistically-mutated view of the remote
//! users collection.
//!
//! All three mutators follow one pattern: capture an immutable snapshot,
//! apply the projected mutation locally, run the remote write, and on a
//! recoverable failure restore the snapshot (a full state swap, not a
//! field-level undo). Mutations are serialized by a single in-flight
//! mutation permit, so every snapshot chain is linear and a rollback can
//! never clobber an unrelated optimistic edit.
//!
//! The initial read-all is gated on the session and cancellable: the
//! caller receives a [`FetchHandle`] whose cancellation guarantees no
//! further state mutation from that call.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use optic_core::{CollectionSnapshot, OptimisticCollection, SessionSnapshot, Snapshot};
use optic_types::{User, UserId};

use crate::classify::{classify, Classified};
use crate::error::ClientError;
use crate::transport::{Transport, TransportError};

struct Inner {
    collection: OptimisticCollection,
    is_loading: bool,
    error: String,
}

/// The users collection store.
///
/// Application-lifetime value, shared via `Arc`. Reads the session's
/// current token to gate fetching; consumers observe the collection
/// through a watch channel of snapshots.
pub struct UserStore<T: Transport> {
    transport: Arc<T>,
    session: watch::Receiver<SessionSnapshot>,
    state: Mutex<Inner>,
    /// Single in-flight mutation permit; held from snapshot through
    /// reconciliation.
    mutation: Mutex<()>,
    changes: watch::Sender<CollectionSnapshot>,
}

impl<T: Transport> UserStore<T> {
    /// Create an empty store observing the given session.
    pub fn new(transport: Arc<T>, session: watch::Receiver<SessionSnapshot>) -> Self {
        let (changes, _) = watch::channel(CollectionSnapshot::default());
        Self {
            transport,
            session,
            state: Mutex::new(Inner {
                collection: OptimisticCollection::new(),
                is_loading: false,
                error: String::new(),
            }),
            mutation: Mutex::new(()),
            changes,
        }
    }

    /// Subscribe to collection snapshots.
    pub fn subscribe(&self) -> watch::Receiver<CollectionSnapshot> {
        self.changes.subscribe()
    }

    /// The current collection snapshot.
    pub fn snapshot(&self) -> CollectionSnapshot {
        self.changes.borrow().clone()
    }

    /// Read the whole collection, replacing the cached items wholesale.
    ///
    /// Requires an authenticated session. Cancellation leaves the loading
    /// flag, items and error exactly as they were before the call.
    pub async fn fetch_all(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        let session = self.session.borrow().clone();
        if !session.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }

        let was_loading = {
            let mut inner = self.state.lock().await;
            let was = inner.is_loading;
            inner.is_loading = true;
            self.publish(&inner);
            was
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                let mut inner = self.state.lock().await;
                inner.is_loading = was_loading;
                self.publish(&inner);
                return Ok(());
            }
            result = self.transport.list_users(&session.token) => result,
        };

        match result {
            Ok(items) => {
                tracing::debug!(count = items.len(), "fetched collection");
                let mut inner = self.state.lock().await;
                inner.collection.replace_all(items);
                inner.is_loading = false;
                self.publish(&inner);
                Ok(())
            }
            Err(err) => match classify(err)? {
                Classified::Cancelled => {
                    let mut inner = self.state.lock().await;
                    inner.is_loading = was_loading;
                    self.publish(&inner);
                    Ok(())
                }
                Classified::Recoverable(message) => {
                    tracing::warn!(error = %message, "fetch failed");
                    let mut inner = self.state.lock().await;
                    inner.error = message;
                    inner.is_loading = false;
                    self.publish(&inner);
                    Ok(())
                }
            },
        }
    }

    /// Run [`fetch_all`](Self::fetch_all) on a background task.
    ///
    /// The returned handle cancels the outstanding request when invoked
    /// (or dropped, as a scoped-resource release on consumer teardown).
    pub fn spawn_fetch(self: &Arc<Self>) -> FetchHandle {
        let store = Arc::clone(self);
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let task = tokio::spawn(async move { store.fetch_all(&child).await });
        FetchHandle { cancel, task }
    }

    /// Watch the session and keep the collection in step with it.
    ///
    /// Triggers exactly one fetch per transition into an authenticated
    /// session (including a session already authenticated at bind time,
    /// e.g. hydrated from storage) and cancels the outstanding fetch when
    /// the session becomes unauthenticated.
    pub fn bind_session(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut sessions = self.session.clone();
        tokio::spawn(async move {
            let mut active: Option<FetchHandle> = None;
            let mut last_token = {
                let token = sessions.borrow_and_update().token.clone();
                if !token.is_empty() {
                    active = Some(store.spawn_fetch());
                }
                token
            };
            while sessions.changed().await.is_ok() {
                let token = sessions.borrow_and_update().token.clone();
                if token == last_token {
                    continue;
                }
                if token.is_empty() {
                    // Signed out: release the outstanding fetch.
                    if let Some(handle) = active.take() {
                        handle.cancel();
                    }
                } else {
                    // Replacing the handle drops (and thereby cancels) a
                    // fetch from a superseded session.
                    active = Some(store.spawn_fetch());
                }
                last_token = token;
            }
        })
    }

    /// Optimistically prepend a new entity and store it remotely.
    ///
    /// An entity with an empty identifier receives a client placeholder,
    /// reconciled with the server-assigned identifier once the write is
    /// acknowledged. On a recoverable failure the pre-mutation snapshot is
    /// restored and the classified message surfaced.
    pub async fn create_user(&self, mut user: User) -> Result<(), ClientError> {
        let _permit = self.mutation.lock().await;

        if user.id.as_str().is_empty() {
            user.id = UserId::placeholder();
        }
        let placeholder = user.id.clone();

        let snapshot = {
            let mut inner = self.state.lock().await;
            let snapshot = inner.collection.begin();
            inner.collection.insert_front(user.clone());
            self.publish(&inner);
            snapshot
        };

        match self.transport.create_user(&user).await {
            Ok(stored) => {
                let mut inner = self.state.lock().await;
                inner.collection.reconcile_created(&placeholder, stored);
                self.publish(&inner);
                Ok(())
            }
            Err(err) => self.recover("create", err, snapshot).await,
        }
    }

    /// Optimistically replace the entity with a matching identifier and
    /// store the change remotely.
    ///
    /// An unknown identifier makes the local replace a visible no-op, but
    /// the write is still attempted.
    pub async fn update_user(&self, user: User) -> Result<(), ClientError> {
        let _permit = self.mutation.lock().await;

        let snapshot = {
            let mut inner = self.state.lock().await;
            let snapshot = inner.collection.begin();
            inner.collection.replace(user.clone());
            self.publish(&inner);
            snapshot
        };

        match self.transport.update_user(&user).await {
            Ok(stored) => {
                let mut inner = self.state.lock().await;
                inner.collection.replace(stored);
                self.publish(&inner);
                Ok(())
            }
            Err(err) => self.recover("update", err, snapshot).await,
        }
    }

    /// Optimistically remove the entity with a matching identifier and
    /// delete it remotely.
    pub async fn delete_user(&self, user: User) -> Result<(), ClientError> {
        let _permit = self.mutation.lock().await;

        let snapshot = {
            let mut inner = self.state.lock().await;
            let snapshot = inner.collection.begin();
            inner.collection.remove(&user.id);
            self.publish(&inner);
            snapshot
        };

        match self.transport.delete_user(&user).await {
            Ok(()) => Ok(()),
            Err(err) => self.recover("delete", err, snapshot).await,
        }
    }

    /// Recover a failed write: roll back to the pre-mutation snapshot and
    /// surface the classified message. Cancellations mutate nothing;
    /// unrecognized errors re-raise before any recovery runs.
    async fn recover(
        &self,
        operation: &'static str,
        err: TransportError,
        snapshot: Snapshot,
    ) -> Result<(), ClientError> {
        match classify(err)? {
            Classified::Cancelled => Ok(()),
            Classified::Recoverable(message) => {
                tracing::warn!(operation, error = %message, "write failed, rolling back");
                let mut inner = self.state.lock().await;
                inner.collection.restore(snapshot);
                inner.error = message;
                self.publish(&inner);
                Ok(())
            }
        }
    }

    fn publish(&self, inner: &Inner) {
        self.changes.send_replace(CollectionSnapshot {
            items: inner.collection.items().to_vec(),
            is_loading: inner.is_loading,
            error: inner.error.clone(),
        });
    }
}

/// Handle to an outstanding background fetch.
///
/// Cancelling (explicitly or by dropping the handle) aborts the request;
/// the fetch then performs no further state mutation.
pub struct FetchHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<(), ClientError>>,
}

impl FetchHandle {
    /// Cancel the outstanding fetch.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the fetch to finish and surface its result.
    pub async fn join(mut self) -> Result<(), ClientError> {
        match (&mut self.task).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Ok(()),
        }
    }
}

impl Drop for FetchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use crate::storage::MemoryTokenStore;
    use crate::transport::MockTransport;
    use optic_types::Location;
    use std::time::Duration;

    fn user(id: &str, first: &str) -> User {
        User {
            id: UserId::new(id),
            first_name: first.into(),
            last_name: "Doe".into(),
            email: format!("{first}@example.com"),
            gender: "other".into(),
            location: Location {
                city: "Berlin".into(),
                country: "DE".into(),
            },
            picture_url: String::new(),
        }
    }

    /// A store whose session is already authenticated. The sender keeps
    /// the session channel alive for the test's duration.
    fn authenticated_store(
        transport: &MockTransport,
    ) -> (Arc<UserStore<MockTransport>>, watch::Sender<SessionSnapshot>) {
        let (sender, receiver) = watch::channel(SessionSnapshot {
            token: "T1".into(),
            ..SessionSnapshot::default()
        });
        let store = Arc::new(UserStore::new(Arc::new(transport.clone()), receiver));
        (store, sender)
    }

    async fn seeded_store(
        transport: &MockTransport,
        users: Vec<User>,
    ) -> (Arc<UserStore<MockTransport>>, watch::Sender<SessionSnapshot>) {
        let (store, session) = authenticated_store(transport);
        transport.queue_users(users);
        store.fetch_all(&CancellationToken::new()).await.unwrap();
        (store, session)
    }

    #[tokio::test]
    async fn fetch_replaces_items_wholesale() {
        let transport = MockTransport::new();
        let (store, _session) = authenticated_store(&transport);
        transport.queue_users(vec![user("1", "a"), user("2", "b")]);

        store.fetch_all(&CancellationToken::new()).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.items.len(), 2);
        assert_eq!(snap.items[0].id, UserId::new("1"));
        assert!(!snap.is_loading);
        assert_eq!(transport.list_tokens(), vec!["T1".to_string()]);
    }

    #[tokio::test]
    async fn fetch_without_session_is_rejected() {
        let transport = MockTransport::new();
        let (_sender, receiver) = watch::channel(SessionSnapshot::default());
        let store = UserStore::new(Arc::new(transport.clone()), receiver);

        let result = store.fetch_all(&CancellationToken::new()).await;
        assert!(matches!(result, Err(ClientError::NotAuthenticated)));
        assert_eq!(transport.list_calls(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_sets_error_and_keeps_items() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;

        transport.fail_next_list(TransportError::Network("connection reset".into()));
        store.fetch_all(&CancellationToken::new()).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.items.len(), 1);
        assert_eq!(snap.error, "connection reset");
        assert!(!snap.is_loading);
    }

    #[tokio::test]
    async fn cancelled_fetch_mutates_nothing() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;
        let before = store.snapshot();

        transport.stall_next_list();
        let handle = store.spawn_fetch();
        // Let the fetch reach the transport before cancelling.
        while transport.list_calls() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        handle.cancel();
        handle.join().await.unwrap();

        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;
        let before = store.snapshot();

        transport.stall_next_list();
        {
            let _handle = store.spawn_fetch();
            while transport.list_calls() < 2 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        // Give the cancelled task a moment to unwind.
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn transport_cancellation_is_suppressed() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;
        let before = store.snapshot();

        transport.fail_next_list(TransportError::Cancelled);
        store.fetch_all(&CancellationToken::new()).await.unwrap();

        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn create_prepends_and_reconciles_id() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;
        transport.assign_next_create_id(UserId::new("server-9"));

        store.create_user(user("", "new")).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.items.len(), 2);
        assert_eq!(snap.items[0].id, UserId::new("server-9"));
        assert!(!snap.items.iter().any(|u| u.id.is_placeholder()));
        // The write carried the placeholder, not the server id.
        assert!(transport.created_users()[0].id.is_placeholder());
    }

    #[tokio::test]
    async fn failed_create_rolls_back() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;
        let before = store.snapshot().items;

        transport.fail_next_create(TransportError::Remote {
            status: 400,
            message: Some("email taken".into()),
            body: String::new(),
        });
        store.create_user(user("x", "dupe")).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.items, before);
        assert_eq!(snap.error, "email taken");
    }

    #[tokio::test]
    async fn update_replaces_matching_entity() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a"), user("2", "b")]).await;

        let mut edited = user("2", "b");
        edited.first_name = "edited".into();
        store.update_user(edited).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.items[1].first_name, "edited");
        assert_eq!(snap.items.len(), 2);
    }

    #[tokio::test]
    async fn update_unknown_id_is_invisible_but_still_writes() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;
        let before = store.snapshot().items;

        store.update_user(user("99", "ghost")).await.unwrap();

        assert_eq!(store.snapshot().items, before);
        assert_eq!(transport.updated_users().len(), 1);
    }

    #[tokio::test]
    async fn failed_update_rolls_back() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;

        transport.fail_next_update(TransportError::Network("timeout".into()));
        let mut edited = user("1", "a");
        edited.first_name = "edited".into();
        store.update_user(edited).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.items[0].first_name, "a");
        assert_eq!(snap.error, "timeout");
    }

    #[tokio::test]
    async fn delete_removes_entity() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a"), user("2", "b")]).await;

        store.delete_user(user("1", "a")).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.items.len(), 1);
        assert_eq!(snap.items[0].id, UserId::new("2"));
        assert_eq!(transport.deleted_users().len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_restores_items_and_surfaces_message() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;
        let before = store.snapshot().items;

        transport.fail_next_delete(TransportError::Remote {
            status: 404,
            message: Some("not found".into()),
            body: String::new(),
        });
        store.delete_user(user("1", "a")).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.items, before);
        assert_eq!(snap.error, "not found");
    }

    #[tokio::test]
    async fn contract_error_escapes_without_rollback() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a")]).await;

        transport.fail_next_delete(TransportError::InvalidBody("unexpected body".into()));
        let result = store.delete_user(user("1", "a")).await;

        assert!(matches!(result, Err(ClientError::Contract(_))));
        // Recovery never ran: the optimistic removal stands.
        assert!(store.snapshot().items.is_empty());
    }

    #[tokio::test]
    async fn successful_mutation_sequence_matches_expected_items() {
        let transport = MockTransport::new();
        let (store, _session) = seeded_store(&transport, vec![user("1", "a"), user("2", "b")]).await;

        transport.assign_next_create_id(UserId::new("3"));
        store.create_user(user("", "c")).await.unwrap();

        let mut edited = user("1", "a");
        edited.first_name = "renamed".into();
        store.update_user(edited).await.unwrap();

        store.delete_user(user("2", "b")).await.unwrap();

        let snapshot = store.snapshot();
        let ids: Vec<&str> = snapshot
            .items
            .iter()
            .map(|u| u.id.as_str())
            .collect();
        assert_eq!(ids, ["3", "1"]);
        assert_eq!(store.snapshot().items[1].first_name, "renamed");
    }

    #[tokio::test]
    async fn bind_session_fetches_once_per_authentication() {
        let transport = MockTransport::new();
        transport.queue_token("T1");
        transport.queue_token("T2");
        transport.queue_users(vec![user("1", "a")]);
        transport.queue_users(vec![user("1", "a"), user("2", "b")]);

        let session = Arc::new(
            SessionStore::new(
                Arc::new(transport.clone()),
                Arc::new(MemoryTokenStore::new()),
            )
            .unwrap(),
        );
        let store = Arc::new(UserStore::new(
            Arc::new(transport.clone()),
            session.subscribe(),
        ));
        let _autofetch = store.bind_session();

        session.sign_in("a@b.com", "pw").await.unwrap();
        while store.snapshot().items.is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(transport.list_calls(), 1);

        session.sign_out().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(transport.list_calls(), 1);

        session.sign_in("a@b.com", "pw").await.unwrap();
        while store.snapshot().items.len() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(transport.list_calls(), 2);
    }

    #[tokio::test]
    async fn bind_session_cancels_fetch_on_sign_out() {
        let transport = MockTransport::new();
        transport.queue_token("T1");
        transport.stall_next_list();

        let session = Arc::new(
            SessionStore::new(
                Arc::new(transport.clone()),
                Arc::new(MemoryTokenStore::new()),
            )
            .unwrap(),
        );
        let store = Arc::new(UserStore::new(
            Arc::new(transport.clone()),
            session.subscribe(),
        ));
        let _autofetch = store.bind_session();

        session.sign_in("a@b.com", "pw").await.unwrap();
        while transport.list_calls() < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        session.sign_out().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        // The stalled fetch was abandoned without mutating the store.
        let snap = store.snapshot();
        assert!(snap.items.is_empty());
        assert!(!snap.is_loading);
        assert_eq!(snap.error, "");
    }

    #[tokio::test]
    async fn bind_session_fetches_for_hydrated_session() {
        let transport = MockTransport::new();
        transport.queue_users(vec![user("1", "a")]);

        let session = Arc::new(
            SessionStore::new(
                Arc::new(transport.clone()),
                Arc::new(MemoryTokenStore::with_token("T0")),
            )
            .unwrap(),
        );
        let store = Arc::new(UserStore::new(
            Arc::new(transport.clone()),
            session.subscribe(),
        ));
        let _autofetch = store.bind_session();

        while store.snapshot().items.is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(transport.list_tokens(), vec!["T0".to_string()]);
    }
}
