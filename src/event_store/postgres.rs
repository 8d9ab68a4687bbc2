//! PostgreSQL event store.
//!
//! Each append runs in its own transaction: read the stream version, compare
//! it with the expected version, insert. The unique constraint on
//! `(aggregate_id, version)` turns a race between two writers into a
//! `ConcurrencyConflict` for the loser.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::OperationContext;

use super::repository::{AggregateOperation, EventStore, Snapshot, StoredEvent};
use super::EventStoreError;

type EventRow = (
    Uuid,
    String,
    Uuid,
    i64,
    String,
    serde_json::Value,
    serde_json::Value,
    DateTime<Utc>,
);

fn into_stored_event(row: EventRow) -> StoredEvent {
    let (id, aggregate_type, aggregate_id, version, event_type, event_data, context, created_at) = row;
    StoredEvent {
        id,
        aggregate_type,
        aggregate_id,
        version,
        event_type,
        event_data,
        context,
        created_at,
    }
}

/// Event Store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get current version of an aggregate
    async fn get_current_version(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: Uuid,
    ) -> Result<i64, EventStoreError> {
        let result: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(version) FROM events WHERE aggregate_id = $1
            "#,
        )
        .bind(aggregate_id)
        .fetch_optional(&mut **tx)
        .await?
        .flatten();

        Ok(result.unwrap_or(0))
    }
}

impl EventStore for PgEventStore {
    async fn append(
        &self,
        operation: AggregateOperation,
        context: &OperationContext,
    ) -> Result<StoredEvent, EventStoreError> {
        let context_json = serde_json::to_value(context)?;

        let mut tx = self.pool.begin().await?;

        let current_version = Self::get_current_version(&mut tx, operation.aggregate_id).await?;
        if current_version != operation.expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: operation.aggregate_id,
                expected: operation.expected_version,
                actual: current_version,
            });
        }

        let event_id = Uuid::new_v4();
        let new_version = operation.expected_version + 1;

        let inserted: Result<DateTime<Utc>, sqlx::Error> = sqlx::query_scalar(
            r#"
            INSERT INTO events (
                id, aggregate_type, aggregate_id, version,
                event_type, event_data, context
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING created_at
            "#,
        )
        .bind(event_id)
        .bind(&operation.aggregate_type)
        .bind(operation.aggregate_id)
        .bind(new_version)
        .bind(&operation.event_type)
        .bind(&operation.event_data)
        .bind(&context_json)
        .fetch_one(&mut *tx)
        .await;

        let created_at = match inserted {
            Ok(created_at) => created_at,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // Another writer committed this version between our read and insert
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id: operation.aggregate_id,
                    expected: operation.expected_version,
                    actual: new_version,
                });
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        Ok(StoredEvent {
            id: event_id,
            aggregate_type: operation.aggregate_type,
            aggregate_id: operation.aggregate_id,
            version: new_version,
            event_type: operation.event_type,
            event_data: operation.event_data,
            context: context_json,
            created_at,
        })
    }

    async fn load_events(
        &self,
        aggregate_id: Uuid,
        after_version: i64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, aggregate_type, aggregate_id, version, event_type, event_data, context, created_at
            FROM events
            WHERE aggregate_id = $1 AND version > $2
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id)
        .bind(after_version)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(into_stored_event).collect())
    }

    async fn load_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<Snapshot>, EventStoreError> {
        let result: Option<(i64, serde_json::Value)> = sqlx::query_as(
            r#"
            SELECT version, state
            FROM event_snapshots
            WHERE aggregate_type = $1 AND aggregate_id = $2
            "#,
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result.map(|(version, state)| Snapshot {
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            version,
            state,
        }))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<(), EventStoreError> {
        sqlx::query(
            r#"
            INSERT INTO event_snapshots (aggregate_type, aggregate_id, version, state)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (aggregate_type, aggregate_id)
            DO UPDATE SET version = $3, state = $4, created_at = NOW()
            WHERE event_snapshots.version < $3
            "#,
        )
        .bind(&snapshot.aggregate_type)
        .bind(snapshot.aggregate_id)
        .bind(snapshot.version)
        .bind(&snapshot.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
