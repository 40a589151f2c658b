//! Live connection registry keyed by user identity.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tokio_util::sync::CancellationToken;

use crate::domain::{Connection, ConnectionId, UserId};

use super::delivery_queue::DeliveryQueue;

/// Everything the core needs to reach one live connection
#[derive(Clone)]
pub struct ConnectionHandle {
    pub connection: Connection,
    pub queue: Arc<DeliveryQueue>,
    /// Cancelled on teardown; stops the connection's writer
    pub cancel: CancellationToken,
    /// Set once the pending backlog is queued; live chats skip the handle until then
    live: Arc<AtomicBool>,
}

impl ConnectionHandle {
    pub fn new(connection: Connection, queue: DeliveryQueue) -> Self {
        Self {
            connection,
            queue: Arc::new(queue),
            cancel: CancellationToken::new(),
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether live chat messages may be queued to this connection
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire) && !self.cancel.is_cancelled()
    }

    pub fn mark_live(&self) {
        self.live.store(true, Ordering::Release);
    }

    /// Stop routing to this connection and cancel its writer.
    ///
    /// Whatever it could not take stays pending and is redelivered, in order,
    /// when the user reconnects.
    pub fn retire(&self) {
        self.live.store(false, Ordering::Release);
        self.cancel.cancel();
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.connection.user_id
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("connection", &self.connection)
            .field("queued", &self.queue.len())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Proof of registration, required to unregister
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationToken {
    user_id: UserId,
    connection_id: ConnectionId,
}

impl RegistrationToken {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

/// Tracks live connections per user.
///
/// Entries are sharded by user id, so unrelated users never contend on the
/// same lock. A user may hold any number of concurrent connections.
pub struct ConnectionRegistry {
    users: DashMap<UserId, Vec<ConnectionHandle>>,
    /// Per-user delivery gates; see [`ConnectionRegistry::lock_delivery`]
    gates: DashMap<UserId, Arc<Mutex<()>>>,
    size: watch::Sender<usize>,
}

/// Exclusive right to queue chat messages to one user's connections
pub struct DeliveryGuard<'a> {
    registry: &'a ConnectionRegistry,
    user: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // nobody holds or waits on the gate any more
        self.registry
            .gates
            .remove_if(&self.user, |_, gate| Arc::strong_count(gate) == 1);
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        let (size, _) = watch::channel(0);
        Self {
            users: DashMap::new(),
            gates: DashMap::new(),
            size,
        }
    }

    /// Serialize chat delivery to `user`.
    ///
    /// Live dispatch and backlog redelivery both queue under this gate, so a
    /// connection never sees a newer message ahead of an older pending one.
    /// Gates are per user; unrelated users never wait on each other.
    pub async fn lock_delivery(&self, user: &UserId) -> DeliveryGuard<'_> {
        let gate = self.gates.entry(user.clone()).or_default().clone();
        let guard = gate.lock_owned().await;
        DeliveryGuard {
            registry: self,
            user: user.clone(),
            guard: Some(guard),
        }
    }

    /// Connections of `user` that accept live chat messages
    pub fn lookup_live(&self, user: &UserId) -> Vec<ConnectionHandle> {
        let mut handles = self.lookup(user);
        handles.retain(ConnectionHandle::is_live);
        handles
    }

    /// Add a connection. Never fails.
    pub fn register(&self, handle: ConnectionHandle) -> RegistrationToken {
        let token = RegistrationToken {
            user_id: handle.user_id().clone(),
            connection_id: handle.id(),
        };

        self.users
            .entry(token.user_id.clone())
            .or_default()
            .push(handle);
        self.size.send_modify(|n| *n += 1);

        tracing::debug!(
            "Registered connection {} for '{}' ({} live)",
            token.connection_id,
            token.user_id,
            self.connection_count()
        );
        token
    }

    /// Remove a connection; `None` if it was already removed.
    pub fn unregister(&self, token: &RegistrationToken) -> Option<ConnectionHandle> {
        let removed = match self.users.entry(token.user_id.clone()) {
            Entry::Occupied(mut entry) => {
                let handles = entry.get_mut();
                let removed = handles
                    .iter()
                    .position(|h| h.id() == token.connection_id)
                    .map(|index| handles.remove(index));
                if handles.is_empty() {
                    entry.remove();
                }
                removed
            }
            Entry::Vacant(_) => None,
        };

        if removed.is_some() {
            self.size.send_modify(|n| *n = n.saturating_sub(1));
            tracing::debug!(
                "Unregistered connection {} for '{}' ({} live)",
                token.connection_id,
                token.user_id,
                self.connection_count()
            );
        }
        removed
    }

    /// Live connections of `user`, oldest first. Empty when offline.
    pub fn lookup(&self, user: &UserId) -> Vec<ConnectionHandle> {
        self.users
            .get(user)
            .map(|handles| handles.value().clone())
            .unwrap_or_default()
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.users.contains_key(user)
    }

    /// Online users with their connection counts, sorted by user id
    pub fn online_users(&self) -> Vec<(UserId, usize)> {
        let mut users: Vec<(UserId, usize)> = self
            .users
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect();
        users.sort_by(|a, b| a.0.cmp(&b.0));
        users
    }

    pub fn connection_count(&self) -> usize {
        *self.size.borrow()
    }

    /// Observe registry size changes (for metrics)
    pub fn subscribe_size(&self) -> watch::Receiver<usize> {
        self.size.subscribe()
    }
}
