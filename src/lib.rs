//! owner_ledger Library
//!
//! Re-exports modules for the server binary, the load test and integration testing.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod event_store;
pub mod handlers;
pub mod publisher;

mod error;

pub use config::Config;
pub use error::{AppError, ErrorResponse};
pub use domain::{Amount, AmountError, Balance, LedgerError, LedgerEvent, OperationContext};
pub use handlers::{LedgerHandler, LedgerOptions};
