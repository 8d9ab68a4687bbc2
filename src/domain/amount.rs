//! Amount type
//!
//! Domain primitives for ledger quantities.
//! `Amount` is what a caller asks to move; `Balance` is what the account holds.
//! Both are integral and unsigned, so a negative value cannot be represented.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amount represents a validated, strictly positive quantity.
///
/// # Invariants
/// - Value is always positive (> 0)
///
/// # Example
/// ```
/// use owner_ledger::domain::Amount;
///
/// let amount = Amount::new(100).unwrap();
/// assert_eq!(amount.value(), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u128);

/// Errors that can occur when creating an Amount or Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(u128),

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value == 0
    pub fn new(value: u128) -> Result<Self, AmountError> {
        if value == 0 {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Get the underlying value.
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_quantity(s)?;
        Amount::new(value)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0.to_string()
    }
}

/// Balance represents an account balance (zero or positive).
///
/// Arithmetic is checked: `credit` returns `None` on overflow and
/// `debit` returns `None` when the balance would go below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Balance(u128);

impl Balance {
    pub fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if balance is sufficient for withdrawal
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Option<Balance> {
        self.0.checked_add(amount.value()).map(Balance)
    }

    /// Subtract amount from balance
    pub fn debit(&self, amount: &Amount) -> Option<Balance> {
        self.0.checked_sub(amount.value()).map(Balance)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Balance {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_quantity(s).map(Balance)
    }
}

impl TryFrom<String> for Balance {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Balance::from_str(&value)
    }
}

impl From<Balance> for String {
    fn from(balance: Balance) -> Self {
        balance.0.to_string()
    }
}

fn parse_quantity(s: &str) -> Result<u128, AmountError> {
    let trimmed = s.trim();
    if trimmed.starts_with('-') {
        return Err(AmountError::ParseError(format!("negative quantity: {}", trimmed)));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::ParseError(format!("not a decimal integer: {}", trimmed)));
    }
    trimmed
        .parse::<u128>()
        .map_err(|e| AmountError::ParseError(format!("{}: {}", trimmed, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(100);
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), 100);
    }

    #[test]
    fn test_amount_zero_rejected() {
        let amount = Amount::new(0);
        assert!(matches!(amount, Err(AmountError::NotPositive(0))));
    }

    #[test]
    fn test_amount_from_str() {
        let amount: Amount = "123".parse().unwrap();
        assert_eq!(amount.value(), 123);

        assert!(matches!("0".parse::<Amount>(), Err(AmountError::NotPositive(0))));
        assert!(matches!("-5".parse::<Amount>(), Err(AmountError::ParseError(_))));
        assert!(matches!("+5".parse::<Amount>(), Err(AmountError::ParseError(_))));
        assert!(matches!("+0".parse::<Balance>(), Err(AmountError::ParseError(_))));
        assert!(matches!("1.5".parse::<Amount>(), Err(AmountError::ParseError(_))));
        assert!(matches!("abc".parse::<Amount>(), Err(AmountError::ParseError(_))));
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let amount = Amount::new(u128::MAX).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));

        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::zero();
        let amount = Amount::new(100).unwrap();

        let balance = balance.credit(&amount).unwrap();
        assert_eq!(balance.value(), 100);

        let withdraw = Amount::new(30).unwrap();
        let balance = balance.debit(&withdraw).unwrap();
        assert_eq!(balance.value(), 70);
    }

    #[test]
    fn test_balance_insufficient() {
        let balance = Balance::new(50);
        let amount = Amount::new(100).unwrap();

        assert!(!balance.is_sufficient_for(&amount));
        assert!(balance.debit(&amount).is_none());
    }

    #[test]
    fn test_balance_credit_overflow() {
        let balance = Balance::new(u128::MAX);
        let amount = Amount::new(1).unwrap();
        assert!(balance.credit(&amount).is_none());
    }

    #[test]
    fn test_balance_zero_parses() {
        let balance: Balance = "0".parse().unwrap();
        assert!(balance.is_zero());
    }
}
