//! Account Aggregate
//!
//! The single ledger account: an owner bound at creation and a balance.
//! Commands never mutate the account; they return the event to persist.
//! `transition` applies that event to a copy and re-checks the arithmetic,
//! so a caller only ever commits a state that has already been verified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{Amount, Balance, LedgerError, LedgerEvent};

use super::Aggregate;

/// Who may burn the account balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnPolicy {
    /// Any caller may burn
    #[default]
    Unrestricted,
    /// Only the owner may burn
    OwnerOnly,
}

impl FromStr for BurnPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unrestricted" => Ok(Self::Unrestricted),
            "owner_only" => Ok(Self::OwnerOnly),
            other => Err(format!("unknown burn policy '{}'", other)),
        }
    }
}

impl fmt::Display for BurnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BurnPolicy::Unrestricted => write!(f, "unrestricted"),
            BurnPolicy::OwnerOnly => write!(f, "owner_only"),
        }
    }
}

/// Account Aggregate
///
/// State is derived from events, never directly mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account ID
    id: Uuid,

    /// Sole identity allowed to deposit and withdraw
    owner: Uuid,

    /// Current balance (derived from events)
    balance: Balance,

    /// Current version (number of events applied)
    version: i64,

    /// When the account was created
    created_at: Option<DateTime<Utc>>,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            owner: Uuid::nil(),
            balance: Balance::zero(),
            version: 0,
            created_at: None,
        }
    }
}

impl Account {
    /// Create a new account and generate the creation event
    pub fn create(account_id: Uuid, owner: Uuid, initial_balance: Balance) -> (Self, LedgerEvent) {
        let now = Utc::now();

        let event = LedgerEvent::AccountCreated {
            account_id,
            owner,
            initial_balance,
            created_at: now,
        };

        let account = Self {
            id: account_id,
            owner,
            balance: initial_balance,
            version: 1,
            created_at: Some(now),
        };

        (account, event)
    }

    /// Fails with `Unauthorized` unless `caller` is the owner.
    pub fn authorize(&self, caller: Uuid) -> Result<(), LedgerError> {
        if !self.is_owner(caller) {
            return Err(LedgerError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Deposit into the account.
    /// Returns the event to be persisted, or an error if not allowed.
    pub fn deposit(&self, caller: Uuid, amount: &Amount) -> Result<LedgerEvent, LedgerError> {
        self.authorize(caller)?;

        let balance_after = self
            .balance
            .credit(amount)
            .ok_or(LedgerError::ArithmeticOverflow {
                balance: self.balance,
                amount: amount.value(),
            })?;

        Ok(LedgerEvent::Deposit {
            account_id: self.id,
            amount: *amount,
            balance_after,
            deposited_at: Utc::now(),
        })
    }

    /// Withdraw from the account.
    /// Authorization is checked before sufficiency.
    pub fn withdraw(&self, caller: Uuid, amount: &Amount) -> Result<LedgerEvent, LedgerError> {
        self.authorize(caller)?;

        if !self.balance.is_sufficient_for(amount) {
            return Err(LedgerError::insufficient_balance(self.balance, amount.value()));
        }

        let balance_after = self
            .balance
            .debit(amount)
            .ok_or_else(|| LedgerError::insufficient_balance(self.balance, amount.value()))?;

        Ok(LedgerEvent::Withdraw {
            account_id: self.id,
            amount: *amount,
            balance_after,
            withdrawn_at: Utc::now(),
        })
    }

    /// Reset the balance to zero, whatever it currently is.
    pub fn burn(&self, caller: Uuid, policy: BurnPolicy) -> Result<LedgerEvent, LedgerError> {
        if policy == BurnPolicy::OwnerOnly {
            self.authorize(caller)?;
        }

        Ok(LedgerEvent::Burn {
            account_id: self.id,
            burned: self.balance,
            burned_by: caller,
            burned_at: Utc::now(),
        })
    }

    /// Apply `event` to a copy of this account and verify the result.
    ///
    /// The expected balance is recomputed from the current state rather than
    /// trusted from the event, and must agree with both the event's
    /// `balance_after` and the state `apply` produced.
    pub fn transition(&self, event: LedgerEvent) -> Result<Self, LedgerError> {
        if event.account_id() != self.id {
            return Err(LedgerError::invariant(format!(
                "event for account {} applied to account {}",
                event.account_id(),
                self.id
            )));
        }

        let expected = match &event {
            LedgerEvent::AccountCreated { .. } => {
                return Err(LedgerError::invariant("account is already created"));
            }
            LedgerEvent::Deposit { amount, balance_after, .. } => {
                let expected = self.balance.credit(amount).ok_or(LedgerError::ArithmeticOverflow {
                    balance: self.balance,
                    amount: amount.value(),
                })?;
                if *balance_after != expected {
                    return Err(LedgerError::invariant(format!(
                        "deposit of {} on {} recorded balance {}, expected {}",
                        amount, self.balance, balance_after, expected
                    )));
                }
                expected
            }
            LedgerEvent::Withdraw { amount, balance_after, .. } => {
                let expected = self
                    .balance
                    .debit(amount)
                    .ok_or_else(|| LedgerError::insufficient_balance(self.balance, amount.value()))?;
                if *balance_after != expected {
                    return Err(LedgerError::invariant(format!(
                        "withdrawal of {} on {} recorded balance {}, expected {}",
                        amount, self.balance, balance_after, expected
                    )));
                }
                expected
            }
            LedgerEvent::Burn { burned, .. } => {
                if *burned != self.balance {
                    return Err(LedgerError::invariant(format!(
                        "burn recorded {} but balance is {}",
                        burned, self.balance
                    )));
                }
                Balance::zero()
            }
        };

        let next = self.clone().apply(event);

        if next.balance != expected {
            return Err(LedgerError::invariant(format!(
                "balance after transition is {}, expected {}",
                next.balance, expected
            )));
        }
        if next.owner != self.owner {
            return Err(LedgerError::invariant("owner changed during transition"));
        }
        if next.version != self.version + 1 {
            return Err(LedgerError::invariant(format!(
                "version advanced from {} to {}",
                self.version, next.version
            )));
        }

        Ok(next)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn is_owner(&self, caller: Uuid) -> bool {
        self.owner == caller
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Aggregate for Account {
    type Event = LedgerEvent;

    fn aggregate_type() -> &'static str {
        "LedgerAccount"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(mut self, event: Self::Event) -> Self {
        match event {
            LedgerEvent::AccountCreated {
                account_id,
                owner,
                initial_balance,
                created_at,
            } => {
                if self.version == 0 {
                    self.id = account_id;
                    self.owner = owner;
                    self.balance = initial_balance;
                    self.created_at = Some(created_at);
                } else {
                    // Owner is immutable once bound
                    tracing::error!(
                        "Ignoring repeated AccountCreated for account {} at version {}",
                        self.id,
                        self.version
                    );
                }
            }

            LedgerEvent::Deposit { amount, balance_after, .. } => match self.balance.credit(&amount) {
                Some(new_balance) => {
                    if new_balance != balance_after {
                        tracing::error!(
                            "Deposit replay for account {} computed {} but event recorded {}",
                            self.id,
                            new_balance,
                            balance_after
                        );
                    }
                    self.balance = new_balance;
                }
                None => {
                    tracing::error!(
                        "Balance overflow during deposit replay for account {}: {} + {}",
                        self.id,
                        self.balance,
                        amount
                    );
                }
            },

            LedgerEvent::Withdraw { amount, balance_after, .. } => match self.balance.debit(&amount) {
                Some(new_balance) => {
                    if new_balance != balance_after {
                        tracing::error!(
                            "Withdraw replay for account {} computed {} but event recorded {}",
                            self.id,
                            new_balance,
                            balance_after
                        );
                    }
                    self.balance = new_balance;
                }
                None => {
                    tracing::error!(
                        "Balance underflow during withdraw replay for account {}: {} - {}",
                        self.id,
                        self.balance,
                        amount
                    );
                }
            },

            LedgerEvent::Burn { .. } => {
                self.balance = Balance::zero();
            }
        }

        self.version += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(value: u128) -> Amount {
        Amount::new(value).unwrap()
    }

    fn funded(balance: u128) -> (Account, Uuid) {
        let owner = Uuid::new_v4();
        let (account, _) = Account::create(Uuid::new_v4(), owner, Balance::new(balance));
        (account, owner)
    }

    #[test]
    fn test_account_create() {
        let account_id = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let (account, event) = Account::create(account_id, owner, Balance::new(100));

        assert_eq!(account.id(), account_id);
        assert_eq!(account.owner(), owner);
        assert_eq!(account.balance(), Balance::new(100));
        assert_eq!(account.version(), 1);
        assert!(matches!(event, LedgerEvent::AccountCreated { .. }));
    }

    #[test]
    fn test_replayed_creation_matches_created_state() {
        let (account, event) = Account::create(Uuid::new_v4(), Uuid::new_v4(), Balance::new(7));
        let replayed = Account::default().apply(event);
        assert_eq!(replayed, account);
    }

    #[test]
    fn test_deposit_by_owner() {
        let (account, owner) = funded(100);

        let event = account.deposit(owner, &amount(50)).unwrap();
        let account = account.transition(event).unwrap();

        assert_eq!(account.balance(), Balance::new(150));
        assert_eq!(account.version(), 2);
    }

    #[test]
    fn test_deposit_by_stranger_is_unauthorized() {
        let (account, _) = funded(100);
        let stranger = Uuid::new_v4();

        let result = account.deposit(stranger, &amount(10));
        assert_eq!(result, Err(LedgerError::Unauthorized { caller: stranger }));
        assert_eq!(account.balance(), Balance::new(100));
    }

    #[test]
    fn test_deposit_overflow() {
        let (account, owner) = funded(u128::MAX);

        let result = account.deposit(owner, &amount(1));
        assert!(matches!(result, Err(LedgerError::ArithmeticOverflow { .. })));
    }

    #[test]
    fn test_withdraw_by_owner() {
        let (account, owner) = funded(100);

        let event = account.withdraw(owner, &amount(30)).unwrap();
        let account = account.transition(event).unwrap();

        assert_eq!(account.balance(), Balance::new(70));
    }

    #[test]
    fn test_withdraw_exact_balance() {
        let (account, owner) = funded(150);

        let event = account.withdraw(owner, &amount(150)).unwrap();
        let account = account.transition(event).unwrap();

        assert!(account.balance().is_zero());
    }

    #[test]
    fn test_withdraw_insufficient_balance() {
        let (account, owner) = funded(150);

        let result = account.withdraw(owner, &amount(200));
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                current: Balance::new(150),
                requested: 200,
            })
        );
    }

    #[test]
    fn test_withdraw_checks_authorization_before_balance() {
        let (account, _) = funded(0);
        let stranger = Uuid::new_v4();

        // Both checks would fail; authorization must win.
        let result = account.withdraw(stranger, &amount(1));
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
    }

    #[test]
    fn test_burn_unrestricted() {
        let (account, _) = funded(500);
        let anyone = Uuid::new_v4();

        let event = account.burn(anyone, BurnPolicy::Unrestricted).unwrap();
        assert!(matches!(event, LedgerEvent::Burn { burned, .. } if burned == Balance::new(500)));

        let account = account.transition(event).unwrap();
        assert!(account.balance().is_zero());
    }

    #[test]
    fn test_burn_when_already_zero() {
        let (account, owner) = funded(0);

        let event = account.burn(owner, BurnPolicy::Unrestricted).unwrap();
        let account = account.transition(event).unwrap();

        assert!(account.balance().is_zero());
        assert_eq!(account.version(), 2);
    }

    #[test]
    fn test_burn_owner_only() {
        let (account, owner) = funded(10);
        let stranger = Uuid::new_v4();

        assert!(matches!(
            account.burn(stranger, BurnPolicy::OwnerOnly),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(account.burn(owner, BurnPolicy::OwnerOnly).is_ok());
    }

    #[test]
    fn test_transition_rejects_tampered_event() {
        let (account, owner) = funded(100);

        let event = match account.deposit(owner, &amount(50)).unwrap() {
            LedgerEvent::Deposit { account_id, amount, deposited_at, .. } => LedgerEvent::Deposit {
                account_id,
                amount,
                balance_after: Balance::new(151),
                deposited_at,
            },
            other => panic!("unexpected event {:?}", other),
        };

        assert!(matches!(
            account.transition(event),
            Err(LedgerError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_transition_rejects_stale_burn() {
        let (account, owner) = funded(100);
        let burn = account.burn(owner, BurnPolicy::Unrestricted).unwrap();

        let deposit = account.deposit(owner, &amount(1)).unwrap();
        let account = account.transition(deposit).unwrap();

        // Burn decided against balance 100 no longer matches 101
        assert!(matches!(
            account.transition(burn),
            Err(LedgerError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_transition_rejects_foreign_event() {
        let (account, _) = funded(100);
        let (other, other_owner) = funded(100);

        let event = other.deposit(other_owner, &amount(1)).unwrap();
        assert!(matches!(
            account.transition(event),
            Err(LedgerError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_repeated_creation_does_not_change_owner() {
        let (account, owner) = funded(100);
        let (_, hijack) = Account::create(account.id(), Uuid::new_v4(), Balance::new(1_000_000));

        let account = account.apply(hijack);
        assert_eq!(account.owner(), owner);
        assert_eq!(account.balance(), Balance::new(100));
        assert_eq!(account.version(), 2);
    }

    #[test]
    fn test_burn_policy_parse() {
        assert_eq!("unrestricted".parse::<BurnPolicy>(), Ok(BurnPolicy::Unrestricted));
        assert_eq!("OWNER_ONLY".parse::<BurnPolicy>(), Ok(BurnPolicy::OwnerOnly));
        assert!("nobody".parse::<BurnPolicy>().is_err());
        assert_eq!(BurnPolicy::default(), BurnPolicy::Unrestricted);
    }

    #[test]
    fn test_should_snapshot_every_hundred_versions() {
        let (mut account, owner) = funded(0);
        for _ in 0..98 {
            let event = account.deposit(owner, &amount(1)).unwrap();
            account = account.transition(event).unwrap();
        }
        assert_eq!(account.version(), 99);
        assert!(!account.should_snapshot());

        let event = account.deposit(owner, &amount(1)).unwrap();
        let account = account.transition(event).unwrap();
        assert!(account.should_snapshot());
    }
}
