//! Connection registry for RPC sessions.
//!
//! Each session gets a bounded mpsc channel feeding its websocket write
//! loop. The registry is keyed by caller identity: a second connection for
//! the same identity replaces the first entry (last connect wins) without
//! closing the older socket. Entries are not reaped when a read loop exits;
//! [`ConnectionHandle::is_connected`] reports whether the write side is
//! still alive, and graceful shutdown drains every entry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use super::config::ConnectionConfig;

/// Unique identifier for one upgraded socket, assigned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Message to be sent outbound to a connection.
#[derive(Debug)]
pub enum OutboundMessage {
    /// A binary payload (one compressed envelope).
    Binary(Vec<u8>),
    /// A close frame with an optional reason.
    Close(Option<String>),
}

/// Error returned when sending a message to a connection fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The send operation timed out (channel is full and remained full).
    Timeout,
    /// The connection has been closed; the receiver was dropped.
    Disconnected,
}

/// Handle to a single connection.
///
/// The receiver end of `tx` is held by the websocket write loop.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Per-socket identifier; distinguishes reconnects of one identity.
    pub id: ConnectionId,
    /// Caller identity parsed from the upgrade request.
    pub identity: u64,
    /// Sender end of the bounded outbound message channel.
    pub tx: mpsc::Sender<OutboundMessage>,
    /// When this connection was established.
    pub connected_at: Instant,
}

impl ConnectionHandle {
    /// Attempts to send a message without blocking.
    ///
    /// Returns `true` if the message was enqueued.
    #[must_use]
    pub fn try_send(&self, msg: OutboundMessage) -> bool {
        self.tx.try_send(msg).is_ok()
    }

    /// Sends a message with a timeout.
    ///
    /// # Errors
    ///
    /// Returns `SendError::Timeout` if the channel remains full for the
    /// entire timeout duration. Returns `SendError::Disconnected` if the
    /// receiver has been dropped (connection closed).
    pub async fn send_timeout(
        &self,
        msg: OutboundMessage,
        timeout: Duration,
    ) -> Result<(), SendError> {
        match tokio::time::timeout(timeout, self.tx.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SendError::Disconnected),
            Err(_) => Err(SendError::Timeout),
        }
    }

    /// Checks whether the write loop is still running.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Thread-safe registry of connections keyed by caller identity.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<u64, Arc<ConnectionHandle>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Creates a new empty registry. Connection ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a connection for `identity`, replacing any earlier entry.
    ///
    /// Returns the new handle and the receiver for the write loop.
    pub fn register(
        &self,
        identity: u64,
        config: &ConnectionConfig,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(config.outbound_channel_capacity);

        let handle = Arc::new(ConnectionHandle {
            id,
            identity,
            tx,
            connected_at: Instant::now(),
        });

        if let Some(previous) = self.connections.insert(identity, Arc::clone(&handle)) {
            debug!(
                identity,
                replaced = previous.id.0,
                conn_id = id.0,
                "identity reconnected; replacing registry entry"
            );
        }
        metrics::gauge!("zedex_connections").set(self.connections.len() as f64);
        (handle, rx)
    }

    /// Looks up the current connection for an identity.
    pub fn get(&self, identity: u64) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&identity).map(|r| r.value().clone())
    }

    /// Number of registered identities, live or stale.
    #[must_use]
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Number of registered connections whose write loop is still running.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().is_connected())
            .count()
    }

    /// Removes and returns all connections. Used during graceful shutdown.
    pub fn drain_all(&self) -> Vec<Arc<ConnectionHandle>> {
        let keys: Vec<u64> = self.connections.iter().map(|entry| *entry.key()).collect();

        let mut handles = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((_, handle)) = self.connections.remove(&key) {
                handles.push(handle);
            }
        }
        metrics::gauge!("zedex_connections").set(0.0);
        handles
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
