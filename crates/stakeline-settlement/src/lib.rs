//! # stakeline-settlement
//!
//! **Game Settlement Engine**: the wager lifecycle, winner determination,
//! fee-adjusted payouts and settlement digests.
//!
//! ## Lifecycle
//!
//! ```text
//! create_game ──▶ ACTIVE ──join_game──▶ ENDED      (settled in the same unit)
//!                   │
//!                   └──cancel_game──▶ CANCELLED   (creator refunded)
//! ```
//!
//! ## Money Flow
//!
//! - **Create**: creator debited `round(amount × (1 + fee))`
//! - **Join, decisive**: opponent debited the same, winner credited
//!   `round(amount × 2 × (1 − fee))`, loser nothing
//! - **Join, tie**: both refunded their stake plus fee
//! - **Cancel**: creator refunded their stake plus fee
//!
//! All balance changes go through [`stakeline_ledger::LedgerTxn`].

pub mod engine;
pub mod rules;
pub mod validation;

pub use engine::GameEngine;
pub use rules::{Outcome, Payouts, beats, settlement_digest};
pub use validation::{
    CreateGameRequest, JoinGameRequest, ValidCreate, validate_create, validate_join,
};
