//! Deposit ledger entries.
//!
//! A `Transaction` mirrors an on-chain transfer into or out of a user's
//! custodial deposit address. It is recorded as PENDING when the client
//! submits the signature, and flipped to CONFIRMED by the reconciler once the
//! chain reports it finalized. The flip happens exactly once and carries
//! exactly one balance delta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, StakelineError, TransactionKey, TxSignature, UserId, user};

/// Direction of the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Deposit,
    Withdraw,
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdraw => write!(f, "WITHDRAW"),
        }
    }
}

/// Confirmation state. `Pending → Confirmed` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub owner: UserId,
    pub signature: TxSignature,
    pub kind: TxKind,
    /// Magnitude of the transfer; the sign comes from `kind`.
    pub amount: u64,
    pub status: TxStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    #[must_use]
    pub fn pending(owner: UserId, signature: TxSignature, kind: TxKind, amount: u64) -> Self {
        Self {
            owner,
            signature,
            kind,
            amount,
            status: TxStatus::Pending,
            created_at: Utc::now(),
            confirmed_at: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> TransactionKey {
        TransactionKey::new(self.owner.clone(), self.signature.clone())
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }

    /// The ledger delta this transaction applies once confirmed.
    pub fn balance_delta(&self) -> Result<i64> {
        match self.kind {
            TxKind::Deposit => user::credit(self.amount),
            TxKind::Withdraw => user::debit(self.amount),
        }
    }

    /// Transition to CONFIRMED.
    ///
    /// # Errors
    /// Returns [`StakelineError::DuplicateTransaction`] if already confirmed.
    pub fn mark_confirmed(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.status == TxStatus::Confirmed {
            return Err(StakelineError::DuplicateTransaction(self.key()));
        }
        self.status = TxStatus::Confirmed;
        self.confirmed_at = Some(at);
        Ok(())
    }
}
