//! Command Handlers module
//!
//! Handlers orchestrate the aggregate, the event store and the event sinks.

mod commands;
mod ledger_handler;

pub use commands::*;
pub use ledger_handler::{LedgerHandler, LedgerOptions};
