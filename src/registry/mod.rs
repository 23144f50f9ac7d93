//! Live-connection tracking.
//!
//! The registry is process-wide shared mutable state: every WebSocket
//! connection registers a [`ConnectionHandle`] when it subscribes, and the
//! broadcast engine queries it at fan-out time. It is injected wherever it is
//! needed — never reached through a global — and rebuilt empty on restart.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

pub type ConnectionId = Uuid;

// ─── ConnectionState ──────────────────────────────────────────────────────────

/// Lifecycle of one live connection.
///
/// `Error` is reachable from `Connecting` and `Open`; for delivery purposes
/// it is equivalent to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Closed,
    Error,
}

impl ConnectionState {
    /// True once the connection can never deliver again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Error)
    }
}

// ─── ConnectionHandle ─────────────────────────────────────────────────────────

/// Server-side handle to one live connection: identity, liveness, and the
/// outbound frame queue drained by the connection's writer loop.
///
/// Cloning is cheap; all clones observe the same state cell and feed the same
/// queue.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(state),
            outbound,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Transition the connection. Read-state monotonicity is not enforced
    /// here; callers only move forward through the lifecycle.
    pub fn set_state(&self, next: ConnectionState) {
        self.state.send_replace(next);
    }

    /// Observe state transitions without polling.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Enqueue one frame for the writer loop. Returns false when the writer
    /// is gone, which callers treat the same as a closed connection.
    pub fn try_deliver(&self, frame: String) -> bool {
        self.outbound.send(frame).is_ok()
    }
}

// ─── SubscriptionRegistry ─────────────────────────────────────────────────────

struct Subscriber {
    handle: ConnectionHandle,
    address: String,
}

/// Which live connections are interested in which address.
///
/// One connection holds at most one subscription; subscribing again replaces
/// the previous address (last-write-wins). Entries live only as long as the
/// connection does.
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: RwLock<HashMap<ConnectionId, Subscriber>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest of `handle` in `address`, replacing any prior
    /// subscription of the same connection.
    pub async fn subscribe(&self, handle: &ConnectionHandle, address: &str) {
        let mut inner = self.inner.write().await;
        inner.insert(
            handle.id,
            Subscriber {
                handle: handle.clone(),
                address: address.to_string(),
            },
        );
    }

    /// Drop the connection from the registry. Called on disconnect; safe to
    /// call for connections that never subscribed.
    pub async fn unsubscribe_all(&self, id: ConnectionId) {
        self.inner.write().await.remove(&id);
    }

    /// Handles of every connection currently subscribed to `address`.
    pub async fn subscribers_for(&self, address: &str) -> Vec<ConnectionHandle> {
        self.inner
            .read()
            .await
            .values()
            .filter(|s| s.address == address)
            .map(|s| s.handle.clone())
            .collect()
    }

    /// The address a connection is subscribed to, if any.
    pub async fn subscription_of(&self, id: ConnectionId) -> Option<String> {
        self.inner.read().await.get(&id).map(|s| s.address.clone())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
