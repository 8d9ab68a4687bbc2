//! Event Store Repository
//!
//! The storage contract shared by every backend, plus the replay and
//! snapshot helpers built on top of it.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::domain::OperationContext;

use super::EventStoreError;

/// Stored event
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub version: i64,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Serialized aggregate state at a given version
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub version: i64,
    pub state: serde_json::Value,
}

/// Operation to be performed on an aggregate
#[derive(Debug, Clone)]
pub struct AggregateOperation {
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub expected_version: i64,
    pub event_type: String,
    pub event_data: serde_json::Value,
}

impl AggregateOperation {
    /// Create a new aggregate operation
    pub fn new<E: Serialize>(
        aggregate_type: &str,
        aggregate_id: Uuid,
        expected_version: i64,
        event_type: &str,
        event: &E,
    ) -> Result<Self, EventStoreError> {
        let event_data = serde_json::to_value(event)?;
        Ok(Self {
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            expected_version,
            event_type: event_type.to_string(),
            event_data,
        })
    }
}

/// Append-only event storage with optimistic concurrency.
///
/// `append` must fail with `ConcurrencyConflict` unless the stream's current
/// version equals `expected_version`, and must store the event at
/// `expected_version + 1`. Either the event is stored or nothing is.
pub trait EventStore: Send + Sync + 'static {
    fn append(
        &self,
        operation: AggregateOperation,
        context: &OperationContext,
    ) -> impl Future<Output = Result<StoredEvent, EventStoreError>> + Send;

    /// Events with `version > after_version`, ordered by version
    fn load_events(
        &self,
        aggregate_id: Uuid,
        after_version: i64,
    ) -> impl Future<Output = Result<Vec<StoredEvent>, EventStoreError>> + Send;

    fn load_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> impl Future<Output = Result<Option<Snapshot>, EventStoreError>> + Send;

    /// Replace any previous snapshot of the aggregate
    fn save_snapshot(
        &self,
        snapshot: Snapshot,
    ) -> impl Future<Output = Result<(), EventStoreError>> + Send;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore,
{
    fn append(
        &self,
        operation: AggregateOperation,
        context: &OperationContext,
    ) -> impl Future<Output = Result<StoredEvent, EventStoreError>> + Send {
        (**self).append(operation, context)
    }

    fn load_events(
        &self,
        aggregate_id: Uuid,
        after_version: i64,
    ) -> impl Future<Output = Result<Vec<StoredEvent>, EventStoreError>> + Send {
        (**self).load_events(aggregate_id, after_version)
    }

    fn load_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> impl Future<Output = Result<Option<Snapshot>, EventStoreError>> + Send {
        (**self).load_snapshot(aggregate_type, aggregate_id)
    }

    fn save_snapshot(
        &self,
        snapshot: Snapshot,
    ) -> impl Future<Output = Result<(), EventStoreError>> + Send {
        (**self).save_snapshot(snapshot)
    }
}

/// Load an aggregate by replaying events on top of its latest snapshot.
///
/// Returns `None` when neither a snapshot nor any event exists.
pub async fn load_aggregate<A, S>(
    store: &S,
    aggregate_id: Uuid,
) -> Result<Option<A>, EventStoreError>
where
    S: EventStore,
    A: Aggregate + DeserializeOwned,
    A::Event: DeserializeOwned,
{
    let snapshot = store.load_snapshot(A::aggregate_type(), aggregate_id).await?;

    let (from_version, initial_state) = match snapshot {
        Some(snapshot) => {
            let state: A = serde_json::from_value(snapshot.state)?;
            (snapshot.version, Some(state))
        }
        None => (0, None),
    };

    let events = store.load_events(aggregate_id, from_version).await?;

    if initial_state.is_none() && events.is_empty() {
        return Ok(None);
    }

    let mut aggregate = initial_state.unwrap_or_default();
    for stored_event in events {
        if stored_event.version != aggregate.version() + 1 {
            return Err(EventStoreError::InvalidEventData(format!(
                "aggregate {} expected version {}, stream has {}",
                aggregate_id,
                aggregate.version() + 1,
                stored_event.version
            )));
        }
        let event: A::Event = serde_json::from_value(stored_event.event_data)?;
        aggregate = aggregate.apply(event);
    }

    Ok(Some(aggregate))
}

/// Save a snapshot if the aggregate version warrants it
pub async fn save_snapshot_if_needed<A, S>(store: &S, aggregate: &A) -> Result<bool, EventStoreError>
where
    S: EventStore,
    A: Aggregate + Serialize,
{
    if !aggregate.should_snapshot() {
        return Ok(false);
    }

    let snapshot = Snapshot {
        aggregate_type: A::aggregate_type().to_string(),
        aggregate_id: aggregate.id(),
        version: aggregate.version(),
        state: serde_json::to_value(aggregate)?,
    };
    store.save_snapshot(snapshot).await?;

    tracing::info!(
        "Snapshot saved for {} aggregate {} at version {}",
        A::aggregate_type(),
        aggregate.id(),
        aggregate.version()
    );

    Ok(true)
}
