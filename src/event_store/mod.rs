//! Event Store module
//!
//! Persistence layer for Event Sourcing.
//! The ledger's durable state is its event stream; the in-memory backend
//! serves tests and development, the PostgreSQL backend serves production.

mod error;
mod memory;
mod postgres;
mod repository;

pub use error::EventStoreError;
pub use memory::InMemoryEventStore;
pub use postgres::PgEventStore;
pub use repository::{
    load_aggregate, save_snapshot_if_needed, AggregateOperation, EventStore, Snapshot, StoredEvent,
};
