//! Domain Events
//!
//! Event definitions for Event Sourcing.
//! Events are immutable facts that have happened to the ledger account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, Balance};

/// Ledger account events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// Account was created and bound to its owner
    AccountCreated {
        account_id: Uuid,
        owner: Uuid,
        initial_balance: Balance,
        created_at: DateTime<Utc>,
    },

    /// Owner deposited into the account
    Deposit {
        account_id: Uuid,
        amount: Amount,
        balance_after: Balance,
        deposited_at: DateTime<Utc>,
    },

    /// Owner withdrew from the account
    Withdraw {
        account_id: Uuid,
        amount: Amount,
        balance_after: Balance,
        withdrawn_at: DateTime<Utc>,
    },

    /// Balance was reset to zero; `burned` is the balance that was destroyed
    Burn {
        account_id: Uuid,
        burned: Balance,
        burned_by: Uuid,
        burned_at: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::AccountCreated { .. } => "AccountCreated",
            LedgerEvent::Deposit { .. } => "Deposit",
            LedgerEvent::Withdraw { .. } => "Withdraw",
            LedgerEvent::Burn { .. } => "Burn",
        }
    }

    /// Get the account ID this event relates to
    pub fn account_id(&self) -> Uuid {
        match self {
            LedgerEvent::AccountCreated { account_id, .. } => *account_id,
            LedgerEvent::Deposit { account_id, .. } => *account_id,
            LedgerEvent::Withdraw { account_id, .. } => *account_id,
            LedgerEvent::Burn { account_id, .. } => *account_id,
        }
    }

    /// Quantity moved by this event, if any
    pub fn amount(&self) -> Option<u128> {
        match self {
            LedgerEvent::AccountCreated { .. } => None,
            LedgerEvent::Deposit { amount, .. } | LedgerEvent::Withdraw { amount, .. } => {
                Some(amount.value())
            }
            LedgerEvent::Burn { burned, .. } => Some(burned.value()),
        }
    }
}
