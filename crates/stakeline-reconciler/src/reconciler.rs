//! Deposit reconciliation.
//!
//! ```text
//! submit() ──▶ PENDING ──finalized──▶ CONFIRMED (+/− amount)
//!                 │
//!                 ├── not yet ────────▶ stays PENDING (next pass)
//!                 └── lookup fails ───▶ deferred (next pass)
//! ```
//!
//! Chain lookups happen outside any atomic unit. Only the confirmation itself
//! (status re-read, flip, delta) runs inside one, so a slow chain never holds
//! up game settlement.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use stakeline_ledger::{AtomicUnit, Ledger, Notify, Store};
use stakeline_types::{
    EngineConfig, Result, StakelineError, Transaction, TransactionKey, TxKind, TxSignature, UserId,
};

use crate::chain::ChainStatus;
use crate::recent::RecentConfirmations;

/// A client's claim that it sent a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub owner: UserId,
    pub signature: TxSignature,
    pub kind: TxKind,
    pub amount: u64,
}

/// What happened to one pending transaction during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Flipped to CONFIRMED and the delta applied.
    Confirmed,
    /// The chain has not finalized it yet.
    Unconfirmed,
    /// Skipped this pass: the lookup or the confirmation failed.
    Deferred,
    /// Someone already confirmed it.
    AlreadyConfirmed,
}

/// Tally of one [`Reconciler::reconcile`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub pending: usize,
    pub confirmed: usize,
    pub unconfirmed: usize,
    pub deferred: usize,
    pub already_confirmed: usize,
}

impl ReconcileReport {
    fn record(&mut self, outcome: ConfirmOutcome) {
        match outcome {
            ConfirmOutcome::Confirmed => self.confirmed += 1,
            ConfirmOutcome::Unconfirmed => self.unconfirmed += 1,
            ConfirmOutcome::Deferred => self.deferred += 1,
            ConfirmOutcome::AlreadyConfirmed => self.already_confirmed += 1,
        }
    }
}

/// Moves pending deposits and withdrawals to CONFIRMED once the chain agrees.
pub struct Reconciler<S: Store> {
    ledger: Ledger<S>,
    chain: Arc<dyn ChainStatus>,
    recent: Mutex<RecentConfirmations>,
}

impl<S: Store> Reconciler<S> {
    #[must_use]
    pub fn new(ledger: Ledger<S>, chain: Arc<dyn ChainStatus>, recent_capacity: usize) -> Self {
        Self {
            ledger,
            chain,
            recent: Mutex::new(RecentConfirmations::with_capacity(recent_capacity)),
        }
    }

    /// Size the recent-confirmation window from `config`.
    #[must_use]
    pub fn from_config(
        ledger: Ledger<S>,
        chain: Arc<dyn ChainStatus>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(ledger, chain, config.confirmed_cache_size)
    }

    /// Record a new PENDING transaction.
    ///
    /// # Errors
    /// - `InvalidAmount` for a zero or out-of-range amount
    /// - `UserNotFound` if the owner has no account
    /// - `DuplicateTransaction` if `(owner, signature)` was seen before
    /// - `InsufficientBalance` for a withdraw larger than the balance
    pub async fn submit(&self, request: TransactionRequest) -> Result<Transaction> {
        if request.amount == 0 || i64::try_from(request.amount).is_err() {
            return Err(StakelineError::InvalidAmount {
                reason: format!("{} amount {} out of range", request.kind, request.amount),
            });
        }

        let mut txn = self.ledger.begin().await?;
        let unit = txn.unit();
        let owner = unit
            .user(&request.owner)
            .await?
            .ok_or_else(|| StakelineError::UserNotFound(request.owner.clone()))?;

        let key = TransactionKey::new(request.owner.clone(), request.signature.clone());
        if unit.transaction(&key).await?.is_some() {
            return Err(StakelineError::DuplicateTransaction(key));
        }
        if request.kind == TxKind::Withdraw && !owner.can_afford(request.amount) {
            return Err(StakelineError::InsufficientBalance {
                needed: request.amount,
                available: owner.balance,
            });
        }

        let tx = Transaction::pending(
            request.owner,
            request.signature,
            request.kind,
            request.amount,
        );
        unit.put_transaction(tx.clone()).await?;
        self.ledger.commit(txn).await?;

        tracing::info!(
            tx = %tx.key(),
            kind = %tx.kind,
            amount = tx.amount,
            "Transaction submitted"
        );
        Ok(tx)
    }

    /// One pass over every PENDING transaction.
    ///
    /// Individual failures are deferred, never propagated.
    ///
    /// # Errors
    /// Only if the pending list itself cannot be read.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let pending = self.ledger.store().pending_transactions().await?;
        let mut report = ReconcileReport {
            pending: pending.len(),
            ..ReconcileReport::default()
        };
        tracing::info!(pending = report.pending, "Reconciliation pass started");

        for tx in &pending {
            report.record(self.reconcile_one(tx).await);
        }

        tracing::info!(
            pending = report.pending,
            confirmed = report.confirmed,
            unconfirmed = report.unconfirmed,
            deferred = report.deferred,
            already_confirmed = report.already_confirmed,
            "Reconciliation pass finished"
        );
        Ok(report)
    }

    /// Check one transaction against the chain and confirm it if finalized.
    pub async fn reconcile_one(&self, tx: &Transaction) -> ConfirmOutcome {
        let key = tx.key();
        let seen = self.recent().contains(&key);
        if seen {
            tracing::debug!(tx = %key, "Already confirmed by this process");
            return ConfirmOutcome::AlreadyConfirmed;
        }

        match self.chain.is_finalized(&tx.signature, &tx.owner).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(tx = %key, "Not finalized yet");
                return ConfirmOutcome::Unconfirmed;
            }
            Err(err) => {
                tracing::warn!(tx = %key, error = %err, "Chain lookup failed, deferring");
                return ConfirmOutcome::Deferred;
            }
        }

        match self.confirm(&key).await {
            Ok(outcome) => {
                if matches!(
                    outcome,
                    ConfirmOutcome::Confirmed | ConfirmOutcome::AlreadyConfirmed
                ) {
                    // A concurrent pass may have remembered it already.
                    self.recent().remember(key);
                }
                outcome
            }
            Err(err) => {
                tracing::warn!(tx = %key, error = %err, "Confirmation failed, deferring");
                ConfirmOutcome::Deferred
            }
        }
    }

    /// Flip the stored transaction and apply its delta in one unit.
    async fn confirm(&self, key: &TransactionKey) -> Result<ConfirmOutcome> {
        let mut txn = self.ledger.begin().await?;
        let mut tx = txn
            .unit()
            .transaction(key)
            .await?
            .ok_or_else(|| StakelineError::TransactionNotFound(key.clone()))?;
        if !tx.is_pending() {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }

        tx.mark_confirmed(Utc::now())?;
        let account = txn
            .apply_delta(&tx.owner, tx.balance_delta()?, Notify::Deposit)
            .await?;
        txn.unit().put_transaction(tx.clone()).await?;
        self.ledger.commit(txn).await?;

        tracing::info!(
            tx = %key,
            kind = %tx.kind,
            amount = tx.amount,
            balance = account.balance,
            "Transaction confirmed"
        );
        Ok(ConfirmOutcome::Confirmed)
    }

    fn recent(&self) -> MutexGuard<'_, RecentConfirmations> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
