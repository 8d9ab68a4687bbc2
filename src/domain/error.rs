//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;
use uuid::Uuid;

use super::{AmountError, Balance};

/// Errors raised by ledger state transitions.
///
/// Business-rule failures (`Unauthorized`, `InsufficientBalance`,
/// `InvalidAmount`) are recoverable by the caller. `ArithmeticOverflow`
/// and `InvariantViolation` signal a defect and are never caused by a
/// well-formed request against a healthy account.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Caller is not the account owner
    #[error("Unauthorized: caller {caller} is not the account owner")]
    Unauthorized { caller: Uuid },

    /// Withdrawal exceeds the available balance
    #[error("Insufficient balance: current {current}, requested {requested}")]
    InsufficientBalance { current: Balance, requested: u128 },

    /// Balance arithmetic left the representable range
    #[error("Arithmetic overflow: balance {balance}, amount {amount}")]
    ArithmeticOverflow { balance: Balance, amount: u128 },

    /// Invalid amount (zero or malformed)
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// Post-transition check failed
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl LedgerError {
    pub fn insufficient_balance(current: Balance, requested: u128) -> Self {
        Self::InsufficientBalance { current, requested }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::InsufficientBalance { .. } | Self::InvalidAmount(_)
        )
    }
}
