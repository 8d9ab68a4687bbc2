//! In-memory event store.
//!
//! Intended for tests and development: nothing survives a restart.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::OperationContext;

use super::repository::{AggregateOperation, EventStore, Snapshot, StoredEvent};
use super::EventStoreError;

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
    snapshots: RwLock<HashMap<(String, Uuid), Snapshot>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> i64 {
        stream.last().map(|e| e.version).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        operation: AggregateOperation,
        context: &OperationContext,
    ) -> Result<StoredEvent, EventStoreError> {
        let context_json = serde_json::to_value(context)?;

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::LockPoisoned)?;

        let stream = streams.entry(operation.aggregate_id).or_default();
        let current = Self::current_version(stream);

        if current != operation.expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: operation.aggregate_id,
                expected: operation.expected_version,
                actual: current,
            });
        }

        if let Some(first) = stream.first() {
            if first.aggregate_type != operation.aggregate_type {
                return Err(EventStoreError::InvalidEventData(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    first.aggregate_type, operation.aggregate_type
                )));
            }
        }

        let stored = StoredEvent {
            id: Uuid::new_v4(),
            aggregate_type: operation.aggregate_type,
            aggregate_id: operation.aggregate_id,
            version: current + 1,
            event_type: operation.event_type,
            event_data: operation.event_data,
            context: context_json,
            created_at: Utc::now(),
        };
        stream.push(stored.clone());

        Ok(stored)
    }

    async fn load_events(
        &self,
        aggregate_id: Uuid,
        after_version: i64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::LockPoisoned)?;

        Ok(streams
            .get(&aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.version > after_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn load_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<Snapshot>, EventStoreError> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| EventStoreError::LockPoisoned)?;

        Ok(snapshots
            .get(&(aggregate_type.to_string(), aggregate_id))
            .cloned())
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<(), EventStoreError> {
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| EventStoreError::LockPoisoned)?;

        let key = (snapshot.aggregate_type.clone(), snapshot.aggregate_id);
        match snapshots.get(&key) {
            // Never replace a newer snapshot with an older one
            Some(existing) if existing.version >= snapshot.version => {}
            _ => {
                snapshots.insert(key, snapshot);
            }
        }
        Ok(())
    }
}
