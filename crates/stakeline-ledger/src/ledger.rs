//! The balance ledger.
//!
//! [`LedgerTxn`] is the only way balances change. It wraps one atomic unit,
//! applies signed deltas with the non-negative invariant, and collects the
//! notifications those deltas (and any other staged writes) produce. The
//! notifications are released only after the unit commits.
//!
//! ```text
//! Ledger::begin() → apply_delta()* + unit writes → Ledger::commit()
//!                                                      │
//!                                     commit ok ───────┴──▶ publish outbox
//!                                     commit err ─────────▶ nothing applied
//! ```

use std::sync::Arc;

use stakeline_types::{Notification, Result, StakelineError, User, UserId};

use crate::notifier::Notifier;
use crate::store::{AtomicUnit, Store};

/// Whether (and how) a delta is announced to the balance owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// Stage no event.
    Silent,
    /// Stage a balance event with `is_deposit = false`.
    Balance,
    /// Stage a balance event with `is_deposit = true`. Reconciler only.
    Deposit,
}

/// One applied delta, as seen inside the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceChange {
    pub user: UserId,
    pub before: u64,
    pub after: u64,
    pub delta: i64,
}

/// An atomic unit plus the ledger's outbox.
///
/// Dropping a `LedgerTxn` without committing rolls everything back,
/// including staged notifications.
pub struct LedgerTxn<U: AtomicUnit> {
    unit: U,
    outbox: Vec<Notification>,
    changes: Vec<BalanceChange>,
}

impl<U: AtomicUnit> LedgerTxn<U> {
    #[must_use]
    pub fn new(unit: U) -> Self {
        Self {
            unit,
            outbox: Vec::new(),
            changes: Vec::new(),
        }
    }

    /// Stage `delta` against `user`'s balance.
    ///
    /// Nothing is staged on failure.
    ///
    /// # Errors
    /// - `UserNotFound` if the account does not exist
    /// - `InsufficientFunds` if the balance would go negative
    /// - `AmountOverflow` if a credit overflows
    pub async fn apply_delta(&mut self, user: &UserId, delta: i64, notify: Notify) -> Result<User> {
        let mut account = self
            .unit
            .user(user)
            .await?
            .ok_or_else(|| StakelineError::UserNotFound(user.clone()))?;

        let before = account.balance;
        account.balance = account.balance_after(delta)?;
        self.unit.put_user(account.clone()).await?;

        tracing::debug!(
            user = %user,
            before,
            after = account.balance,
            delta,
            "Ledger delta staged"
        );

        self.changes.push(BalanceChange {
            user: user.clone(),
            before,
            after: account.balance,
            delta,
        });
        match notify {
            Notify::Silent => {}
            Notify::Balance | Notify::Deposit => self.outbox.push(Notification::BalanceChanged {
                user: user.clone(),
                balance: account.balance,
                is_deposit: notify == Notify::Deposit,
            }),
        }
        Ok(account)
    }

    /// Queue a notification for after commit.
    pub fn stage(&mut self, event: Notification) {
        self.outbox.push(event);
    }

    /// Direct access to the unit for non-balance reads and writes.
    pub fn unit(&mut self) -> &mut U {
        &mut self.unit
    }

    /// Deltas staged so far, in order.
    #[must_use]
    pub fn changes(&self) -> &[BalanceChange] {
        &self.changes
    }

    /// Commit the unit and hand back the outbox and applied changes.
    ///
    /// # Errors
    /// Propagates the unit's commit failure; in that case nothing was applied.
    pub async fn commit(self) -> Result<Committed> {
        self.unit.commit().await?;
        Ok(Committed {
            notifications: self.outbox,
            changes: self.changes,
        })
    }
}

/// What a successful commit produced.
#[derive(Debug, Default)]
pub struct Committed {
    pub notifications: Vec<Notification>,
    pub changes: Vec<BalanceChange>,
}

/// Store plus notifier: opens ledger transactions and publishes after commit.
pub struct Ledger<S: Store> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
}

impl<S: Store> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: Store> Ledger<S> {
    #[must_use]
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a ledger transaction over a fresh atomic unit.
    pub async fn begin(&self) -> Result<LedgerTxn<S::Unit>> {
        Ok(LedgerTxn::new(self.store.begin().await?))
    }

    /// Commit `txn`, then publish everything it staged.
    ///
    /// Publishing happens strictly after the commit returns and cannot fail.
    pub async fn commit(&self, txn: LedgerTxn<S::Unit>) -> Result<Vec<BalanceChange>> {
        let committed = txn.commit().await?;
        for event in committed.notifications {
            self.notifier.publish(event);
        }
        Ok(committed.changes)
    }

    /// Apply a single delta in its own atomic unit.
    pub async fn apply_delta(&self, user: &UserId, delta: i64, notify: Notify) -> Result<User> {
        let mut txn = self.begin().await?;
        let account = txn.apply_delta(user, delta, notify).await?;
        self.commit(txn).await?;
        Ok(account)
    }

    /// Current committed balance.
    pub async fn balance(&self, user: &UserId) -> Result<u64> {
        self.store
            .user(user)
            .await?
            .map(|account| account.balance)
            .ok_or_else(|| StakelineError::UserNotFound(user.clone()))
    }
}
