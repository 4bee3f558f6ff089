//! Session registry — the per-process map of users to live connections.
//!
//! The registry exclusively owns every connection accepted by this process;
//! connections are never shared or queried across instances. All mutations
//! happen inside one exclusive critical section that is never held across a
//! suspension point, so concurrent connects, disconnects, and delivery
//! snapshots cannot lose updates.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use pulsehub_domain::id::{ConnectionId, UserId};
use pulsehub_domain::time::{Timestamp, now};

use crate::ports::ConnectionTransport;

/// Per-process registry of live duplex connections.
///
/// The underlying maps are never exposed; every read returns a snapshot.
pub struct SessionRegistry<T> {
    inner: RwLock<Inner<T>>,
}

struct Inner<T> {
    connections: HashMap<ConnectionId, ConnectionEntry<T>>,
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
}

struct ConnectionEntry<T> {
    transport: Arc<T>,
    user_id: Option<UserId>,
    awaiting_probe: bool,
    last_pong: Timestamp,
}

/// Result of one liveness sweep: connections to close and transports to probe.
pub struct LivenessSweep<T> {
    /// Connections that never answered the previous probe, already removed.
    pub reaped: Vec<Arc<T>>,
    /// Transports that should receive a fresh probe.
    pub probe: Vec<Arc<T>>,
}

impl<T: ConnectionTransport> SessionRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                connections: HashMap::new(),
                by_user: HashMap::new(),
            }),
        }
    }

    /// Start tracking a freshly accepted, not yet authenticated connection.
    pub fn track(&self, id: ConnectionId, transport: Arc<T>) {
        let mut inner = self.write();
        let previous = inner.connections.insert(
            id,
            ConnectionEntry {
                transport,
                user_id: None,
                awaiting_probe: false,
                last_pong: now(),
            },
        );
        if previous.is_some() {
            warn!(connection_id = %id, "connection id tracked twice");
        }
    }

    /// Bind an authenticated connection to a user.
    ///
    /// Re-registering an already bound connection is a logged no-op: the
    /// original binding stays and membership in the user's set is unchanged.
    pub fn register(&self, id: ConnectionId, user_id: UserId) {
        let mut inner = self.write();
        let Some(entry) = inner.connections.get_mut(&id) else {
            warn!(connection_id = %id, user_id = %user_id, "register called for untracked connection");
            return;
        };
        if let Some(bound) = entry.user_id {
            debug!(
                connection_id = %id,
                bound_user = %bound,
                requested_user = %user_id,
                "connection already registered, keeping existing binding"
            );
            return;
        }
        entry.user_id = Some(user_id);
        inner.by_user.entry(user_id).or_default().insert(id);
    }

    /// Remove a connection from whatever user set holds it and stop tracking
    /// it. Safe to call concurrently with delivery; calling it twice is a
    /// no-op the second time.
    pub fn unregister(&self, id: ConnectionId) {
        let mut inner = self.write();
        inner.remove(id);
    }

    /// Snapshot of the live transports registered under a user.
    #[must_use]
    pub fn connections_for(&self, user_id: UserId) -> Vec<Arc<T>> {
        let inner = self.read();
        let Some(ids) = inner.by_user.get(&user_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| inner.connections.get(id))
            .map(|entry| Arc::clone(&entry.transport))
            .collect()
    }

    /// Snapshot of every live transport on this process, any user and
    /// unauthenticated connections included.
    #[must_use]
    pub fn all_connections(&self) -> Vec<Arc<T>> {
        let inner = self.read();
        inner
            .connections
            .values()
            .map(|entry| Arc::clone(&entry.transport))
            .collect()
    }

    /// Number of users with at least one live connection.
    #[must_use]
    pub fn count_users(&self) -> usize {
        self.read().by_user.len()
    }

    /// Number of tracked connections, authenticated or not.
    #[must_use]
    pub fn count_connections(&self) -> usize {
        self.read().connections.len()
    }

    /// Record a liveness probe answer for a connection.
    pub fn record_pong(&self, id: ConnectionId) {
        let mut inner = self.write();
        if let Some(entry) = inner.connections.get_mut(&id) {
            entry.awaiting_probe = false;
            entry.last_pong = now();
        }
    }

    /// One liveness pass: remove connections that never answered the previous
    /// probe and flag the rest as awaiting a new one.
    ///
    /// The returned transports are acted on by the caller *after* the critical
    /// section: reaped ones get closed, the rest get probed.
    #[must_use]
    pub fn sweep_liveness(&self) -> LivenessSweep<T> {
        let mut inner = self.write();
        let dead: Vec<ConnectionId> = inner
            .connections
            .iter()
            .filter(|(_, entry)| entry.awaiting_probe)
            .map(|(id, _)| *id)
            .collect();

        let mut reaped = Vec::with_capacity(dead.len());
        for id in dead {
            if let Some(entry) = inner.connections.get(&id) {
                debug!(connection_id = %id, last_pong = %entry.last_pong, "connection never answered probe");
            }
            if let Some(transport) = inner.remove(id) {
                reaped.push(transport);
            }
        }

        let mut probe = Vec::with_capacity(inner.connections.len());
        for entry in inner.connections.values_mut() {
            entry.awaiting_probe = true;
            probe.push(Arc::clone(&entry.transport));
        }

        LivenessSweep { reaped, probe }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ConnectionTransport> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Inner<T> {
    /// Remove a connection from both maps, dropping an emptied user set.
    fn remove(&mut self, id: ConnectionId) -> Option<Arc<T>> {
        let entry = self.connections.remove(&id)?;
        if let Some(user_id) = entry.user_id {
            if let Some(set) = self.by_user.get_mut(&user_id) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_user.remove(&user_id);
                }
            }
        }
        Some(entry.transport)
    }
}
