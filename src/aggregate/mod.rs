//! Aggregate module
//!
//! State rebuilt by folding an event stream. The store helpers
//! (`load_aggregate`, `save_snapshot_if_needed`) are generic over this trait.

pub mod account;

pub use account::{Account, BurnPolicy};

/// Versions between snapshots
pub const SNAPSHOT_INTERVAL: i64 = 100;

/// An event-sourced state machine
pub trait Aggregate: Sized + Default {
    type Event;

    /// Stream name stored with every event and snapshot
    fn aggregate_type() -> &'static str;

    fn id(&self) -> uuid::Uuid;

    /// Number of events folded in; doubles as the expected version for the next append
    fn version(&self) -> i64;

    /// Fold one stored event into the state. Must not fail: stored events are facts.
    fn apply(self, event: Self::Event) -> Self;

    fn should_snapshot(&self) -> bool {
        self.version() > 0 && self.version() % SNAPSHOT_INTERVAL == 0
    }
}

