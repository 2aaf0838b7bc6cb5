//! # stakeline-reconciler
//!
//! **Deposit Reconciler**: brings on-chain deposits and withdrawals into the
//! balance ledger.
//!
//! ## Flow
//!
//! 1. A client submits a transfer signature → PENDING [`Transaction`]
//! 2. Each pass asks [`ChainStatus`] whether the signature is finalized
//! 3. Finalized → one atomic unit flips it to CONFIRMED and applies ±amount
//! 4. Not finalized, or the lookup failed → left for the next pass
//!
//! A transaction is confirmed at most once: the unit re-reads its status, and
//! [`RecentConfirmations`] lets a pass skip transfers it already settled.
//!
//! [`Transaction`]: stakeline_types::Transaction

pub mod chain;
pub mod reconciler;
pub mod recent;
pub mod runner;

#[cfg(any(test, feature = "test-helpers"))]
pub use chain::InMemoryChain;
pub use chain::ChainStatus;
pub use reconciler::{ConfirmOutcome, ReconcileReport, Reconciler, TransactionRequest};
pub use recent::RecentConfirmations;
pub use runner::ReconcilerHandle;
