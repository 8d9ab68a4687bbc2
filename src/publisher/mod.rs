//! Event publication
//!
//! Sinks receive an event only after it has been committed to the event
//! store. Delivery is best-effort: the store is the source of truth and a
//! consumer that falls behind can re-read it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::LedgerEvent;

/// An event together with its position in the account stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedEvent {
    pub event_id: Uuid,
    pub version: i64,
    pub committed_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

/// Receiver of committed events.
///
/// `publish` must not fail the mutation that produced the event; a sink
/// that cannot deliver logs and drops.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &CommittedEvent);
}

/// Fan-out to any number of in-process subscribers
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<CommittedEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommittedEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &CommittedEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!(
                event_type = event.event.event_type(),
                version = event.version,
                "No subscribers for committed event"
            );
        }
    }
}

/// Writes every committed event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn publish(&self, event: &CommittedEvent) {
        tracing::info!(
            event_id = %event.event_id,
            account_id = %event.event.account_id(),
            event_type = event.event.event_type(),
            amount = ?event.event.amount(),
            version = event.version,
            "Ledger event committed"
        );
    }
}
