//! Fan-out of newly stored messages to subscribed connections.
//!
//! Delivery is at-most-once and independent per connection: one slow or dead
//! connection never affects the others, and a miss is recovered by the
//! client's periodic refetch rather than by the server. Connections that are
//! still handshaking get a bounded retry window; everything else is
//! delivered immediately or skipped.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::channel::event::ServerEvent;
use crate::registry::{ConnectionHandle, ConnectionState, SubscriptionRegistry};
use crate::storage::MessageRow;

/// Attempts per (connection, message) pair before the event is dropped.
const DELIVERY_ATTEMPTS: u32 = 5;
/// Spacing between attempts for a connection that is not yet open.
const RETRY_SPACING: Duration = Duration::from_secs(1);

// ─── Broadcaster ──────────────────────────────────────────────────────────────

/// Pushes `NEW_MESSAGE` events to every connection subscribed to an address.
pub struct Broadcaster {
    registry: Arc<SubscriptionRegistry>,
    retry_spacing: Duration,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            registry,
            retry_spacing: RETRY_SPACING,
        }
    }

    /// Shrink the retry spacing. Test hook — production uses the fixed
    /// 1-second spacing.
    pub fn with_retry_spacing(mut self, spacing: Duration) -> Self {
        self.retry_spacing = spacing;
        self
    }

    /// Fan a newly stored message out to the address's subscribers.
    ///
    /// Open connections get the frame enqueued in call order, which preserves
    /// per-address broadcast order for them. Connections still handshaking
    /// get a detached bounded-retry task. Closed or errored connections are
    /// skipped. Zero subscribers is a no-op.
    pub async fn message_stored(&self, address: &str, message: &MessageRow) {
        let subscribers = self.registry.subscribers_for(address).await;
        if subscribers.is_empty() {
            trace!(address = %address, "no subscribers — skipping broadcast");
            return;
        }

        let frame = ServerEvent::new_message(message.clone(), address.to_string()).to_frame();
        debug!(
            address = %address,
            message_id = message.id,
            subscribers = subscribers.len(),
            "broadcasting new message"
        );

        for handle in subscribers {
            match handle.state() {
                ConnectionState::Open => {
                    if !handle.try_deliver(frame.clone()) {
                        debug!(conn = %handle.id, "writer gone — delivery dropped");
                    }
                }
                ConnectionState::Connecting => {
                    tokio::spawn(deliver_with_retry(
                        handle,
                        frame.clone(),
                        self.retry_spacing,
                    ));
                }
                ConnectionState::Closed | ConnectionState::Error => {
                    trace!(conn = %handle.id, "connection terminal — delivery skipped");
                }
            }
        }
    }
}

/// Bounded retry for one (connection, message) pair.
///
/// Each attempt re-checks liveness first, so closing the connection cancels
/// the remainder of the loop. Past the bound the event is dropped silently —
/// the refetch path owns recovery.
async fn deliver_with_retry(handle: ConnectionHandle, frame: String, spacing: Duration) {
    for attempt in 1..=DELIVERY_ATTEMPTS {
        match handle.state() {
            ConnectionState::Open => {
                if !handle.try_deliver(frame.clone()) {
                    debug!(conn = %handle.id, attempt, "writer gone — retry abandoned");
                }
                return;
            }
            ConnectionState::Closed | ConnectionState::Error => {
                debug!(conn = %handle.id, attempt, "connection terminal — retry cancelled");
                return;
            }
            ConnectionState::Connecting => {
                tokio::time::sleep(spacing).await;
            }
        }
    }
    debug!(conn = %handle.id, attempts = DELIVERY_ATTEMPTS, "delivery dropped after retry bound");
}

// ─── Tests ────────────────────────────────────────────────────────────────────
