//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use owner_ledger::event_store::InMemoryEventStore;
use owner_ledger::handlers::CreateAccountCommand;
use owner_ledger::{Balance, LedgerHandler, LedgerOptions, OperationContext};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

pub type MemoryLedger = LedgerHandler<Arc<InMemoryEventStore>>;

/// A freshly created account with its store and owner
pub struct TestLedger {
    pub ledger: Arc<MemoryLedger>,
    pub store: Arc<InMemoryEventStore>,
    pub owner: Uuid,
}

pub async fn setup_ledger(initial_balance: u128) -> TestLedger {
    setup_ledger_with(initial_balance, LedgerOptions::new()).await
}

pub async fn setup_ledger_with(initial_balance: u128, options: LedgerOptions) -> TestLedger {
    let store = Arc::new(InMemoryEventStore::new());
    let owner = Uuid::new_v4();
    let command = CreateAccountCommand::new(Uuid::new_v4(), owner, Balance::new(initial_balance));

    let ledger = LedgerHandler::create(store.clone(), options, command, &OperationContext::new())
        .await
        .expect("Failed to create ledger account");

    TestLedger {
        ledger: Arc::new(ledger),
        store,
        owner,
    }
}

/// Connect to the test database; streams use fresh ids so tests never collide
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    assert!(
        owner_ledger::db::check_schema(&pool)
            .await
            .expect("Failed to inspect schema"),
        "Apply migrations/001_event_store.sql before running database tests"
    );

    pool
}
