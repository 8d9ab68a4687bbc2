//! Ledger Handler
//!
//! The transaction boundary around the ledger account. Every mutation runs
//! under the account's write lock:
//!
//! 1. decide: authorization and business rules produce an event
//! 2. verify: the event is applied to a copy and the arithmetic re-checked
//! 3. commit: the event is appended at the expected version
//! 4. swap the verified state in, then publish
//!
//! A failure at steps 1-3 leaves both the store and the in-memory state
//! untouched and publishes nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::aggregate::{Account, Aggregate, BurnPolicy};
use crate::domain::{Amount, Balance, LedgerError, LedgerEvent, OperationContext};
use crate::error::AppError;
use crate::event_store::{
    load_aggregate, save_snapshot_if_needed, AggregateOperation, EventStore, EventStoreError,
    StoredEvent,
};
use crate::publisher::{BroadcastSink, CommittedEvent, EventSink};

use super::{BurnCommand, CommitReceipt, CreateAccountCommand, DepositCommand, WithdrawCommand};

/// Attempts per mutation when another writer bumps the stream version
const MAX_RETRIES: u32 = 3;

/// Construction options for [`LedgerHandler`]
#[derive(Clone)]
pub struct LedgerOptions {
    pub burn_policy: BurnPolicy,
    pub event_channel_capacity: usize,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl LedgerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_burn_policy(mut self, burn_policy: BurnPolicy) -> Self {
        self.burn_policy = burn_policy;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Register an additional sink, invoked after each commit
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            burn_policy: BurnPolicy::default(),
            event_channel_capacity: 256,
            sinks: Vec::new(),
        }
    }
}

/// Handler owning the single ledger account
pub struct LedgerHandler<S> {
    store: S,
    account_id: Uuid,
    state: RwLock<Account>,
    burn_policy: BurnPolicy,
    broadcast: BroadcastSink,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl<S: EventStore> LedgerHandler<S> {
    fn from_state(store: S, account: Account, options: LedgerOptions) -> Self {
        Self {
            store,
            account_id: account.id(),
            state: RwLock::new(account),
            burn_policy: options.burn_policy,
            broadcast: BroadcastSink::new(options.event_channel_capacity),
            sinks: options.sinks,
        }
    }

    /// Create the account and persist its creation event.
    ///
    /// Fails with `AccountAlreadyExists` if the stream already has events.
    pub async fn create(
        store: S,
        options: LedgerOptions,
        command: CreateAccountCommand,
        context: &OperationContext,
    ) -> Result<Self, AppError> {
        let (account, event) =
            Account::create(command.account_id, command.owner, command.initial_balance);

        let operation = AggregateOperation::new(
            Account::aggregate_type(),
            account.id(),
            0,
            event.event_type(),
            &event,
        )?;

        let stored = match store.append(operation, context).await {
            Ok(stored) => stored,
            Err(EventStoreError::ConcurrencyConflict { .. }) => {
                return Err(AppError::AccountAlreadyExists(command.account_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            account_id = %account.id(),
            owner = %account.owner(),
            initial_balance = %account.balance(),
            "Ledger account created"
        );

        let handler = Self::from_state(store, account, options);
        handler.publish(&CommittedEvent {
            event_id: stored.id,
            version: stored.version,
            committed_at: stored.created_at,
            event,
        });

        Ok(handler)
    }

    /// Rebuild the account from its event stream.
    pub async fn open(store: S, options: LedgerOptions, account_id: Uuid) -> Result<Self, AppError> {
        let account: Account = load_aggregate(&store, account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

        tracing::info!(
            account_id = %account_id,
            owner = %account.owner(),
            balance = %account.balance(),
            version = account.version(),
            "Ledger account loaded"
        );

        Ok(Self::from_state(store, account, options))
    }

    /// Open the account if its stream exists, otherwise create it.
    pub async fn open_or_create(
        store: S,
        options: LedgerOptions,
        command: CreateAccountCommand,
        context: &OperationContext,
    ) -> Result<Self, AppError> {
        let existing: Option<Account> = load_aggregate(&store, command.account_id).await?;
        match existing {
            Some(account) => {
                if account.owner() != command.owner {
                    tracing::warn!(
                        account_id = %account.id(),
                        "Configured owner differs from the stored owner; the stored owner is kept"
                    );
                }
                Ok(Self::from_state(store, account, options))
            }
            None => Self::create(store, options, command, context).await,
        }
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn burn_policy(&self) -> BurnPolicy {
        self.burn_policy
    }

    /// Consistent copy of the current account state
    pub async fn account(&self) -> Account {
        self.state.read().await.clone()
    }

    pub async fn balance(&self) -> Balance {
        self.state.read().await.balance()
    }

    /// Receive every event committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CommittedEvent> {
        self.broadcast.subscribe()
    }

    /// The account's full stored event stream
    pub async fn history(&self) -> Result<Vec<StoredEvent>, AppError> {
        Ok(self.store.load_events(self.account_id, 0).await?)
    }

    pub async fn deposit(
        &self,
        command: DepositCommand,
        context: &OperationContext,
    ) -> Result<CommitReceipt, AppError> {
        let DepositCommand { caller, amount } = command;

        self.execute("deposit", context, move |account| {
            account.authorize(caller)?;
            let amount: Amount = amount.parse()?;
            account.deposit(caller, &amount)
        })
        .await
    }

    pub async fn withdraw(
        &self,
        command: WithdrawCommand,
        context: &OperationContext,
    ) -> Result<CommitReceipt, AppError> {
        let WithdrawCommand { caller, amount } = command;

        self.execute("withdraw", context, move |account| {
            account.authorize(caller)?;
            let amount: Amount = amount.parse()?;
            account.withdraw(caller, &amount)
        })
        .await
    }

    pub async fn burn(
        &self,
        command: BurnCommand,
        context: &OperationContext,
    ) -> Result<CommitReceipt, AppError> {
        let caller = command.caller;
        let policy = self.burn_policy;

        self.execute("burn", context, move |account| account.burn(caller, policy))
            .await
    }

    async fn execute<F>(
        &self,
        operation: &'static str,
        context: &OperationContext,
        decide: F,
    ) -> Result<CommitReceipt, AppError>
    where
        F: Fn(&Account) -> Result<LedgerEvent, LedgerError> + Send + Sync,
    {
        let mut account = self.state.write().await;

        for attempt in 0..MAX_RETRIES {
            let event = decide(&*account).map_err(|err| {
                tracing::warn!(
                    account_id = %self.account_id,
                    operation,
                    error = %err,
                    "Ledger operation rejected"
                );
                err
            })?;

            let next = account.transition(event.clone()).map_err(|err| {
                tracing::error!(
                    account_id = %self.account_id,
                    operation,
                    error = %err,
                    "Ledger transition failed verification; nothing committed"
                );
                err
            })?;

            let append = AggregateOperation::new(
                Account::aggregate_type(),
                account.id(),
                account.version(),
                event.event_type(),
                &event,
            )?;

            match self.store.append(append, context).await {
                Ok(stored) => {
                    *account = next;

                    // The event is committed; a missed snapshot only costs replay time
                    if let Err(e) = save_snapshot_if_needed(&self.store, &*account).await {
                        tracing::warn!(
                            account_id = %self.account_id,
                            version = account.version(),
                            "Failed to save snapshot: {}",
                            e
                        );
                    }

                    let receipt = CommitReceipt {
                        account_id: self.account_id,
                        event_id: stored.id,
                        event_type: stored.event_type.clone(),
                        version: stored.version,
                        balance: account.balance(),
                    };

                    self.publish(&CommittedEvent {
                        event_id: stored.id,
                        version: stored.version,
                        committed_at: stored.created_at,
                        event,
                    });

                    tracing::info!(
                        account_id = %self.account_id,
                        operation,
                        version = receipt.version,
                        balance = %receipt.balance,
                        "Ledger operation committed"
                    );

                    return Ok(receipt);
                }
                Err(err) if err.is_concurrency_conflict() => {
                    tracing::warn!(
                        "Concurrency conflict on account {} during {}, reloading (attempt {}/{}): {}",
                        self.account_id,
                        operation,
                        attempt + 1,
                        MAX_RETRIES,
                        err
                    );

                    if attempt + 1 == MAX_RETRIES {
                        break;
                    }

                    let delay = Duration::from_millis(50 * (attempt as u64 + 1));
                    tokio::time::sleep(delay).await;

                    *account = load_aggregate(&self.store, self.account_id)
                        .await?
                        .ok_or_else(|| AppError::AccountNotFound(self.account_id.to_string()))?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(EventStoreError::MaxRetriesExceeded.into())
    }

    fn publish(&self, committed: &CommittedEvent) {
        self.broadcast.publish(committed);
        for sink in &self.sinks {
            sink.publish(committed);
        }
    }
}
