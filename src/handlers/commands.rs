//! Command definitions
//!
//! Commands represent intentions to change the ledger state.
//! Every mutating command names its caller explicitly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Balance;

/// Command to create the ledger account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountCommand {
    pub account_id: Uuid,
    /// Becomes the immutable owner
    pub owner: Uuid,
    pub initial_balance: Balance,
}

impl CreateAccountCommand {
    pub fn new(account_id: Uuid, owner: Uuid, initial_balance: Balance) -> Self {
        Self {
            account_id,
            owner,
            initial_balance,
        }
    }
}

/// Command to deposit into the account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCommand {
    pub caller: Uuid,
    /// Amount to deposit (decimal integer string)
    pub amount: String,
}

impl DepositCommand {
    pub fn new(caller: Uuid, amount: impl Into<String>) -> Self {
        Self {
            caller,
            amount: amount.into(),
        }
    }
}

/// Command to withdraw from the account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCommand {
    pub caller: Uuid,
    /// Amount to withdraw (decimal integer string)
    pub amount: String,
}

impl WithdrawCommand {
    pub fn new(caller: Uuid, amount: impl Into<String>) -> Self {
        Self {
            caller,
            amount: amount.into(),
        }
    }
}

/// Command to reset the balance to zero
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnCommand {
    pub caller: Uuid,
}

impl BurnCommand {
    pub fn new(caller: Uuid) -> Self {
        Self { caller }
    }
}

/// Result of a committed mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub account_id: Uuid,
    pub event_id: Uuid,
    pub event_type: String,
    pub version: i64,
    pub balance: Balance,
}
