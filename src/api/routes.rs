//! API Routes
//!
//! HTTP endpoint definitions.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::domain::{Balance, OperationContext};
use crate::error::AppError;
use crate::event_store::EventStore;
use crate::handlers::{BurnCommand, CommitReceipt, DepositCommand, LedgerHandler, WithdrawCommand};

use super::middleware::{Caller, CALLER_ID_HEADER};

/// Shared router state
pub type LedgerState<S> = Arc<LedgerHandler<S>>;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    /// Positive decimal integer, as a string
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account_id: Uuid,
    pub owner: Uuid,
    pub balance: Balance,
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_id: Uuid,
    pub balance: Balance,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub after_version: i64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub event_type: String,
    pub version: i64,
    pub event_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EventsListResponse {
    pub account_id: Uuid,
    pub events: Vec<EventResponse>,
    pub total: usize,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<S: EventStore>() -> Router<LedgerState<S>> {
    Router::new()
        .route("/account", get(get_account::<S>))
        .route("/balance", get(get_balance::<S>))
        .route("/deposit", post(deposit::<S>))
        .route("/withdraw", post(withdraw::<S>))
        .route("/burn", post(burn::<S>))
        .route("/events", get(get_events::<S>))
}

fn require_caller(caller: Option<Extension<Caller>>) -> Result<Uuid, AppError> {
    caller
        .map(|Extension(Caller(id))| id)
        .ok_or_else(|| AppError::MissingHeader(CALLER_ID_HEADER.to_string()))
}

// =========================================================================
// GET /account
// =========================================================================

async fn get_account<S: EventStore>(
    State(ledger): State<LedgerState<S>>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = ledger.account().await;

    Ok(Json(AccountResponse {
        account_id: account.id(),
        owner: account.owner(),
        balance: account.balance(),
        version: account.version(),
        created_at: account.created_at(),
    }))
}

// =========================================================================
// GET /balance
// =========================================================================

/// Anyone may read the balance
async fn get_balance<S: EventStore>(
    State(ledger): State<LedgerState<S>>,
) -> Result<Json<BalanceResponse>, AppError> {
    Ok(Json(BalanceResponse {
        account_id: ledger.account_id(),
        balance: ledger.balance().await,
    }))
}

// =========================================================================
// POST /deposit, /withdraw, /burn
// =========================================================================

async fn deposit<S: EventStore>(
    State(ledger): State<LedgerState<S>>,
    Extension(context): Extension<OperationContext>,
    caller: Option<Extension<Caller>>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<CommitReceipt>, AppError> {
    let caller = require_caller(caller)?;
    let receipt = ledger
        .deposit(DepositCommand::new(caller, request.amount), &context)
        .await?;
    Ok(Json(receipt))
}

async fn withdraw<S: EventStore>(
    State(ledger): State<LedgerState<S>>,
    Extension(context): Extension<OperationContext>,
    caller: Option<Extension<Caller>>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<CommitReceipt>, AppError> {
    let caller = require_caller(caller)?;
    let receipt = ledger
        .withdraw(WithdrawCommand::new(caller, request.amount), &context)
        .await?;
    Ok(Json(receipt))
}

async fn burn<S: EventStore>(
    State(ledger): State<LedgerState<S>>,
    Extension(context): Extension<OperationContext>,
    caller: Option<Extension<Caller>>,
) -> Result<Json<CommitReceipt>, AppError> {
    let caller = require_caller(caller)?;
    let receipt = ledger.burn(BurnCommand::new(caller), &context).await?;
    Ok(Json(receipt))
}

// =========================================================================
// GET /events
// =========================================================================

async fn get_events<S: EventStore>(
    State(ledger): State<LedgerState<S>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsListResponse>, AppError> {
    let limit = query.limit.min(1000);
    let stored = ledger.history().await?;
    let total = stored.len();

    let events = stored
        .into_iter()
        .filter(|e| e.version > query.after_version)
        .take(limit)
        .map(|e| EventResponse {
            id: e.id,
            event_type: e.event_type,
            version: e.version,
            event_data: e.event_data,
            created_at: e.created_at,
        })
        .collect();

    Ok(Json(EventsListResponse {
        account_id: ledger.account_id(),
        events,
        total,
    }))
}
