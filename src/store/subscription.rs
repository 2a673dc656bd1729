//! Live query subscriptions
//!
//! A `Subscription` receives the full result set of its query once when it
//! is registered and again whenever that result set changes. It is an owned
//! handle: closing or dropping it unregisters the listener.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;

use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{same_ids, Document, DocumentId, Query, Snapshot};

/// Identifier of a registered live query
pub type SubscriptionId = u64;

struct Listener {
    query: Query,
    sender: mpsc::UnboundedSender<Snapshot>,
    /// Ids of the last delivered result set, in order
    delivered: Vec<DocumentId>,
}

/// Registry of live queries, shared between a store and its subscriptions
///
/// Uses a std mutex so `Subscription::drop` can unregister synchronously.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: Mutex<HashMap<SubscriptionId, Listener>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriptionId, Listener>> {
        // A panic while holding the lock leaves the map itself consistent
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a query and deliver its initial result set
    pub(crate) fn register(
        self: &Arc<Self>,
        query: Query,
        initial: Vec<Document>,
    ) -> StoreResult<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let delivered: Vec<DocumentId> = initial.iter().map(|d| d.id.clone()).collect();

        sender
            .send(Snapshot::new(initial))
            .map_err(|_| StoreError::Lock("subscription channel closed".to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(
            id,
            Listener {
                query: query.clone(),
                sender,
                delivered,
            },
        );

        tracing::debug!(
            subscription_id = id,
            collection = %query.collection,
            "Live query registered"
        );

        Ok(Subscription {
            id,
            query,
            receiver,
            registry: Arc::downgrade(self),
        })
    }

    /// Re-evaluate every listener on `collection` and push changed results
    ///
    /// `documents` must be the complete, write-ordered contents of the
    /// collection. Listeners whose receiver is gone are dropped.
    pub(crate) fn notify(&self, collection: &str, documents: &[Document]) {
        let mut listeners = self.lock();
        let mut closed = Vec::new();

        for (id, listener) in listeners.iter_mut() {
            if listener.query.collection != collection {
                continue;
            }

            let result = listener.query.evaluate(documents);
            if same_ids(&result, &listener.delivered) {
                continue;
            }

            listener.delivered = result.iter().map(|d| d.id.clone()).collect();
            if listener.sender.send(Snapshot::new(result)).is_err() {
                closed.push(*id);
            }
        }

        for id in closed {
            listeners.remove(&id);
            tracing::debug!(subscription_id = id, "Dropped listener with closed receiver");
        }
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Drop every listener; their subscriptions see end-of-stream
    pub(crate) fn close_all(&self) -> usize {
        let mut listeners = self.lock();
        let count = listeners.len();
        listeners.clear();
        count
    }
}

/// An owned live query
///
/// Yields the current result set first, then one snapshot per change.
/// `next` returns `None` once the store shuts down.
pub struct Subscription {
    id: SubscriptionId,
    query: Query,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Wait for the next result set
    ///
    /// Cancel-safe: a snapshot is never lost if the future is dropped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Take a pending result set without waiting
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    /// Unregister the live query
    pub fn close(self) {
        tracing::debug!(subscription_id = self.id, "Closing live query");
        // Drop does the unregistration
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("query", &self.query)
            .finish()
    }
}
