//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::event_store::EventStore;

pub use routes::{create_router, LedgerState};

/// Build the application router
pub fn build_router<S: EventStore>(ledger: LedgerState<S>) -> Router {
    // Axum layers run in reverse order of addition: context -> logging -> handler
    let api_routes = create_router::<S>()
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(middleware::context_middleware));

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(ledger)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
