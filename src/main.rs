//! owner_ledger - single-account, owner-controlled balance ledger
//!
//! Serves the ledger over HTTP. The account's history is an event stream
//! kept in PostgreSQL, or in memory when no database is configured.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use owner_ledger::api;
use owner_ledger::db;
use owner_ledger::event_store::{EventStore, InMemoryEventStore, PgEventStore};
use owner_ledger::handlers::CreateAccountCommand;
use owner_ledger::publisher::LoggingSink;
use owner_ledger::{AppError, Config, LedgerHandler, LedgerOptions, OperationContext};

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "owner_ledger=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_json);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        environment = %config.environment,
        account_id = %config.account_id,
        burn_policy = %config.burn_policy,
        "Starting owner_ledger server"
    );

    match config.database_url.clone() {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = db::connect(&database_url, config.database_max_connections).await?;

            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }
            tracing::info!("Database connected successfully");

            serve(PgEventStore::new(pool.clone()), &config, addr).await?;

            pool.close().await;
            tracing::info!("Database connections closed. Goodbye!");
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory event store, history is lost on exit");
            serve(InMemoryEventStore::new(), &config, addr).await?;
        }
    }

    Ok(())
}

/// Open (or create) the ledger account over `store` and serve it until shutdown
async fn serve<S: EventStore>(store: S, config: &Config, addr: SocketAddr) -> anyhow::Result<()> {
    let store = Arc::new(store);
    let options = LedgerOptions::new()
        .with_burn_policy(config.burn_policy)
        .with_event_channel_capacity(config.event_channel_capacity)
        .with_sink(Arc::new(LoggingSink));

    let ledger = match LedgerHandler::open(store.clone(), options.clone(), config.account_id).await {
        Ok(ledger) => ledger,
        Err(AppError::AccountNotFound(_)) => {
            let command = CreateAccountCommand::new(
                config.account_id,
                config.require_owner()?,
                config.initial_balance,
            );
            LedgerHandler::create(store, options, command, &OperationContext::new()).await?
        }
        Err(e) => return Err(e.into()),
    };

    let app = api::build_router(Arc::new(ledger));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
