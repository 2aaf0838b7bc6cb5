//! # stakeline-types
//!
//! Shared types, errors, and configuration for the **Stakeline** wagering
//! ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`GameId`], [`TxSignature`], [`TransactionKey`]
//! - **Account model**: [`User`]
//! - **Game model**: [`Game`], [`GameStatus`], [`Move`]
//! - **Deposit model**: [`Transaction`], [`TxKind`], [`TxStatus`]
//! - **Fees**: [`FeeRate`]
//! - **Notifications**: [`Notification`], [`Audience`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`StakelineError`] with `SL_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod fee;
pub mod game;
pub mod ids;
pub mod notification;
pub mod transaction;
pub mod user;

// Re-export all primary types at crate root for ergonomic imports:
//   use stakeline_types::{Game, User, Transaction, ...};

pub use config::*;
pub use error::*;
pub use fee::*;
pub use game::*;
pub use ids::*;
pub use notification::*;
pub use transaction::*;
pub use user::User;

// Constants are accessed via `stakeline_types::constants::FOO`, and the
// delta helpers via `stakeline_types::user::{credit, debit}`.
