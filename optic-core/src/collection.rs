//! Optimistic collection state for optic.
//!
//! This module provides the locally cached view of the remote users
//! collection with the snapshot/rollback protocol used by optimistic
//! mutations:
//! 1. `begin()` - capture an immutable snapshot of the current items
//! 2. apply the projected mutation (`insert_front`/`replace`/`remove`)
//! 3. run the remote write (done by optic-client)
//! 4. on failure, `restore()` the snapshot - a full state swap, not a
//!    field-level undo, so the cache stays correct under accumulated edits
//!
//! Ordering invariant: reads replace the items wholesale in server order;
//! optimistic inserts prepend.

use optic_types::{User, UserId};

/// An immutable snapshot of the collection, captured before an optimistic
/// mutation and used to roll it back on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    items: Vec<User>,
}

/// The locally cached, optimistically-mutated view of the remote
/// collection.
///
/// Holds the set of entities the client believes exist on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimisticCollection {
    items: Vec<User>,
}

impl OptimisticCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current items, in display order.
    pub fn items(&self) -> &[User] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Capture a snapshot of the current items for rollback.
    pub fn begin(&self) -> Snapshot {
        Snapshot {
            items: self.items.clone(),
        }
    }

    /// Restore the collection to a previously captured snapshot.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.items = snapshot.items;
    }

    /// Replace the items wholesale with a server read, in server order.
    pub fn replace_all(&mut self, items: Vec<User>) {
        self.items = items;
    }

    /// Optimistically insert a new entity at the front.
    pub fn insert_front(&mut self, user: User) {
        self.items.insert(0, user);
    }

    /// Optimistically replace the entity with a matching identifier.
    ///
    /// Returns false (and leaves the items untouched) when no entity
    /// matches; the caller still attempts the remote write.
    pub fn replace(&mut self, user: User) -> bool {
        match self.items.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user;
                true
            }
            None => false,
        }
    }

    /// Optimistically remove the entity with a matching identifier.
    pub fn remove(&mut self, id: &UserId) -> bool {
        let before = self.items.len();
        self.items.retain(|u| u.id != *id);
        self.items.len() != before
    }

    /// Replace the entity carrying a local placeholder identifier with the
    /// server-echoed entity once the create write is acknowledged.
    ///
    /// Returns false when the placeholder is no longer present.
    pub fn reconcile_created(&mut self, placeholder: &UserId, stored: User) -> bool {
        match self.items.iter_mut().find(|u| u.id == *placeholder) {
            Some(slot) => {
                *slot = stored;
                true
            }
            None => false,
        }
    }
}

/// Read-only collection view exposed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionSnapshot {
    /// The cached entities, in display order.
    pub items: Vec<User>,
    /// True only while a full fetch is outstanding.
    pub is_loading: bool,
    /// Current user-facing error message; empty when none.
    pub error: String,
}
