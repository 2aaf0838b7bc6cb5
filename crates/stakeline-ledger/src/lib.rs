//! # stakeline-ledger
//!
//! **Balance Ledger**: the single source of truth for spendable balances.
//!
//! ## Architecture
//!
//! 1. **Store / AtomicUnit**: persistence seams; a unit commits all or nothing
//! 2. **MemoryStore**: serializable in-process reference store
//! 3. **LedgerTxn**: signed deltas with the non-negative invariant, plus an
//!    outbox of notifications released only after commit
//! 4. **Notifier**: fire-and-forget dispatch (`BroadcastNotifier`)
//! 5. **Audit**: supply conservation over a committed snapshot
//!
//! ## Write Flow
//!
//! ```text
//! Ledger.begin() → LedgerTxn.apply_delta() / unit writes → Ledger.commit()
//!     → Notifier.publish()
//! ```
//!
//! Game and deposit logic never touch `User.balance` directly.

pub mod audit;
pub mod ledger;
pub mod memory;
pub mod notifier;
pub mod store;

pub use audit::{SupplyReport, verify_supply};
pub use ledger::{BalanceChange, Committed, Ledger, LedgerTxn, Notify};
pub use memory::{MemoryStore, MemoryUnit};
#[cfg(any(test, feature = "test-helpers"))]
pub use notifier::RecordingNotifier;
pub use notifier::{BroadcastNotifier, Notifier};
pub use store::{AtomicUnit, GameFilter, LedgerSnapshot, Store};
