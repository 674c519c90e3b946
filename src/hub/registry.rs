//! Connection Registry
//!
//! Tracks every live connection and its current subscription filter.
//! The registry is the hub's only shared mutable state: all mutation
//! goes through `add`/`set_filter`/`remove` under the write lock, and
//! broadcasts only ever iterate an immutable [`snapshot`], so a
//! broadcast can never observe a half-updated filter or a connection
//! mid-removal.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};

use super::message::{BroadcastScope, ServerMessage};

/// Connection ID (unique per WebSocket connection)
pub type ConnectionId = u64;

/// Per-connection sender (bounded queue)
pub type ConnectionSender = mpsc::Sender<ServerMessage>;

/// Per-connection subscription criterion
///
/// An empty filter means "global subscriber". `session_id` is carried
/// for forward compatibility but fan-out keys only on `agent_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    pub agent_id: Option<String>,
    pub session_id: Option<String>,
}

impl SubscriptionFilter {
    /// Delivery rule: unfiltered connections receive everything; filtered
    /// connections receive only their agent's scope
    pub fn matches(&self, scope: &BroadcastScope) -> bool {
        match &self.agent_id {
            None => true,
            Some(agent) => scope.agent_id() == Some(agent.as_str()),
        }
    }
}

struct ConnectionEntry {
    sender: ConnectionSender,
    filter: SubscriptionFilter,
}

/// Registry of live connections
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
    next_conn_id: AtomicU64,
    buffer_size: usize,
}

impl ConnectionRegistry {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
            buffer_size,
        }
    }

    /// Register a new connection with an empty filter; always succeeds
    pub async fn add(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.buffer_size);

        self.connections.write().await.insert(
            conn_id,
            ConnectionEntry {
                sender: tx,
                filter: SubscriptionFilter::default(),
            },
        );

        (conn_id, rx)
    }

    /// Replace the connection's filter atomically
    ///
    /// Visible only to snapshots taken afterwards; a broadcast already in
    /// flight keeps the filter it captured. Returns false for a
    /// connection that was already removed.
    pub async fn set_filter(&self, conn_id: ConnectionId, filter: SubscriptionFilter) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get_mut(&conn_id) {
            Some(entry) => {
                entry.filter = filter;
                true
            }
            None => false,
        }
    }

    /// Remove a connection; idempotent (duplicate close is a no-op)
    pub async fn remove(&self, conn_id: ConnectionId) -> bool {
        self.connections.write().await.remove(&conn_id).is_some()
    }

    /// Point-in-time copy of (handle, filter, sender)
    ///
    /// Broadcasts iterate this copy, so concurrent add/remove never
    /// mutates the set being walked.
    pub async fn snapshot(&self) -> Vec<(ConnectionId, SubscriptionFilter, ConnectionSender)> {
        self.connections
            .read()
            .await
            .iter()
            .map(|(id, entry)| (*id, entry.filter.clone(), entry.sender.clone()))
            .collect()
    }

    /// Active connection count
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Drop every connection's sender (shutdown path); connection tasks
    /// observe the channel close and terminate
    pub async fn clear(&self) {
        self.connections.write().await.clear();
    }
}
