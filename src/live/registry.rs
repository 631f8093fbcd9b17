//! Who is connected right now: user handle to the set of open live
//! connections (one per tab or device).

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

pub type ConnectionId = Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("connection closed")]
    Closed,
    #[error("connection outbound queue full")]
    Full,
}

/// Sending half of one live channel. The receiving half belongs to the
/// socket task that writes payloads out.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
}

impl Connection {
    pub fn open(buffer: usize) -> (Connection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Connection {
                id: Uuid::now_v7(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Best-effort, non-blocking.
    pub fn push(&self, payload: String) -> Result<(), DeliveryError> {
        self.tx.try_send(payload).map_err(|err| match err {
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
        })
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

/// Lookups of unknown handles return nothing and removals of unknown
/// connections do nothing; an absent entry and an empty one are the same.
pub trait Registry: Send + Sync + 'static {
    fn register(&self, handle: &str, connection: Connection);

    fn unregister(&self, handle: &str, id: ConnectionId);

    /// A snapshot; the live set may change as soon as this returns.
    fn connections_for(&self, handle: &str) -> Vec<Connection>;

    /// Forgets every connection of `handle`. Once the registry holds no
    /// sender for a connection its socket task sees the queue end and
    /// closes. Returns how many were dropped.
    fn disconnect(&self, handle: &str) -> usize {
        let connections = self.connections_for(handle);
        for connection in &connections {
            self.unregister(handle, connection.id());
        }
        connections.len()
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: DashMap<String, Vec<Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.iter().map(|entry| entry.len()).sum()
    }

    pub fn user_count(&self) -> usize {
        self.inner.len()
    }
}

impl Registry for ConnectionRegistry {
    fn register(&self, handle: &str, connection: Connection) {
        let mut entry = self.inner.entry(handle.to_owned()).or_default();
        if !entry.contains(&connection) {
            entry.push(connection);
        }
        debug!(handle, count = entry.len(), "live connection registered");
    }

    fn unregister(&self, handle: &str, id: ConnectionId) {
        let mut empty = false;
        if let Some(mut entry) = self.inner.get_mut(handle) {
            entry.retain(|connection| connection.id != id);
            empty = entry.is_empty();
            debug!(handle, count = entry.len(), "live connection unregistered");
        }
        if empty {
            // another connection may have registered since the guard dropped
            self.inner.remove_if(handle, |_, connections| connections.is_empty());
        }
    }

    fn connections_for(&self, handle: &str) -> Vec<Connection> {
        self.inner
            .get(handle)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn disconnect(&self, handle: &str) -> usize {
        let dropped = self.inner.remove(handle).map_or(0, |(_, connections)| connections.len());
        debug!(handle, dropped, "live connections dropped");
        dropped
    }
}

/// Keeps one connection registered for as long as it lives.
pub struct Registration {
    registry: Arc<dyn Registry>,
    handle: String,
    id: ConnectionId,
}

impl Registration {
    pub fn new(registry: Arc<dyn Registry>, handle: impl Into<String>, connection: Connection) -> Self {
        let handle = handle.into();
        let id = connection.id();
        registry.register(&handle, connection);
        Self { registry, handle, id }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(&self.handle, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_user_many_connections() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = Connection::open(4);
        let (second, _rx2) = Connection::open(4);

        registry.register("alice", first.clone());
        registry.register("alice", second.clone());

        let found = registry.connections_for("alice");
        assert_eq!(found.len(), 2);
        assert!(found.contains(&first) && found.contains(&second));
        assert_eq!(registry.user_count(), 1);
    }

    #[test]
    fn double_register_is_harmless() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::open(4);

        registry.register("alice", conn.clone());
        registry.register("alice", conn);

        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn unknown_unregister_is_a_noop() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::open(4);
        registry.register("alice", conn);

        registry.unregister("alice", Uuid::now_v7());
        registry.unregister("nobody", Uuid::now_v7());

        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.user_count(), 1);
    }

    #[test]
    fn last_unregister_prunes_the_user() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::open(4);
        registry.register("alice", conn.clone());

        registry.unregister("alice", conn.id());

        assert_eq!(registry.user_count(), 0);
        assert!(registry.connections_for("alice").is_empty());
    }

    #[test]
    fn lookup_of_unknown_user_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.connections_for("ghost").is_empty());
    }

    #[tokio::test]
    async fn disconnect_ends_every_queue_of_the_user() {
        let registry = ConnectionRegistry::new();
        let (first, mut rx1) = Connection::open(4);
        let (second, mut rx2) = Connection::open(4);
        let (other, mut other_rx) = Connection::open(4);
        registry.register("alice", first);
        registry.register("alice", second);
        registry.register("bob", other.clone());

        assert_eq!(registry.disconnect("alice"), 2);
        assert_eq!(registry.disconnect("nobody"), 0);

        assert_eq!(rx1.recv().await, None);
        assert_eq!(rx2.recv().await, None);
        assert_eq!(registry.user_count(), 1);
        other.push("still here".to_owned()).unwrap();
        assert_eq!(other_rx.recv().await.as_deref(), Some("still here"));
    }

    #[test]
    fn registration_unregisters_on_drop() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (conn, _rx) = Connection::open(4);

        let registration = Registration::new(registry.clone(), "alice", conn);
        assert_eq!(registry.connection_count(), 1);

        drop(registration);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn push_reports_closed_and_full() {
        let (conn, rx) = Connection::open(1);
        assert_eq!(conn.push("one".to_owned()), Ok(()));
        assert_eq!(conn.push("two".to_owned()), Err(DeliveryError::Full));

        drop(rx);
        assert_eq!(conn.push("three".to_owned()), Err(DeliveryError::Closed));
    }
}
