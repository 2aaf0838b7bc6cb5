//! # Game: a two-party wager
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐     join      ┌───────┐
//!   │ ACTIVE ├──────────────▶│ ENDED │
//!   └───┬────┘               └───────┘
//!       │ cancel (creator)
//!       ▼
//!   ┌───────────┐
//!   │ CANCELLED │
//!   └───────────┘
//! ```
//!
//! The stake is fixed at creation. The winner is recorded at most once and
//! status never goes backwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FeeRate, GameId, Result, StakelineError, UserId};

/// A player's move. The ordinal is what clients send on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Move {
    Rock = 0,
    Paper = 1,
    Scissors = 2,
}

impl Move {
    pub const ALL: [Self; 3] = [Self::Rock, Self::Paper, Self::Scissors];

    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Move {
    type Error = StakelineError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Rock),
            1 => Ok(Self::Paper),
            2 => Ok(Self::Scissors),
            other => Err(StakelineError::InvalidMove(other)),
        }
    }
}

impl From<Move> for u8 {
    fn from(value: Move) -> Self {
        value.ordinal()
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rock => write!(f, "ROCK"),
            Self::Paper => write!(f, "PAPER"),
            Self::Scissors => write!(f, "SCISSORS"),
        }
    }
}

/// Lifecycle status of a game.
///
/// Transitions are **monotonic**:
/// - `Active → Ended` (an opponent joined and the game settled)
/// - `Active → Cancelled` (the creator withdrew the offer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Ended,
    Cancelled,
}

impl GameStatus {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Active, Self::Ended | Self::Cancelled))
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Ended => write!(f, "ENDED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A wager between a creator and (once joined) an opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    /// Stake per side, in the smallest currency unit. Never changes.
    pub amount: u64,
    pub creator: UserId,
    pub opponent: Option<UserId>,
    pub creator_move: Move,
    pub opponent_move: Option<Move>,
    pub status: GameStatus,
    /// Set once on a decisive settlement; `None` for ties and cancellations.
    pub winner: Option<UserId>,
    /// Fee rate locked in at creation.
    pub fee_rate: FeeRate,
    /// SHA-256 over the settlement inputs and payouts, for audit.
    pub settlement_digest: Option<[u8; 32]>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Game {
    /// A freshly created, unjoined game.
    #[must_use]
    pub fn open(creator: UserId, amount: u64, creator_move: Move, fee_rate: FeeRate) -> Self {
        Self {
            id: GameId::new(),
            amount,
            creator,
            opponent: None,
            creator_move,
            opponent_move: None,
            status: GameStatus::Active,
            winner: None,
            fee_rate,
            settlement_digest: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    /// What each side pays in: stake plus fee.
    pub fn stake_with_fee(&self) -> Result<u64> {
        self.fee_rate.stake_with_fee(self.amount)
    }

    /// Whether `user` is the creator or the opponent.
    #[must_use]
    pub fn involves(&self, user: &UserId) -> bool {
        &self.creator == user || self.opponent.as_ref() == Some(user)
    }

    /// Fail unless the game is still open.
    ///
    /// # Errors
    /// Returns [`StakelineError::GameNotActive`] for ended or cancelled games.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StakelineError::GameNotActive {
                game: self.id,
                status: self.status,
            })
        }
    }

    /// Record the winner. Allowed once, and only before the game has ended.
    pub fn record_winner(&mut self, winner: UserId) -> Result<()> {
        self.ensure_active()?;
        if let Some(existing) = &self.winner {
            return Err(StakelineError::SettlementFailure {
                reason: format!("{} already has winner {existing}", self.id),
            });
        }
        self.winner = Some(winner);
        Ok(())
    }

    /// Transition to ENDED.
    pub fn mark_ended(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.transition(GameStatus::Ended, at)
    }

    /// Transition to CANCELLED.
    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.transition(GameStatus::Cancelled, at)
    }

    fn transition(&mut self, target: GameStatus, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(StakelineError::GameNotActive {
                game: self.id,
                status: self.status,
            });
        }
        self.status = target;
        self.ended_at = Some(at);
        Ok(())
    }
}

/// Dummy game for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Game {
    /// An active game with a random creator move and a 4% fee.
    pub fn dummy(creator: UserId, amount: u64) -> Self {
        let creator_move = Move::ALL[rand::random::<usize>() % Move::ALL.len()];
        Self::open(
            creator,
            amount,
            creator_move,
            FeeRate::new(rust_decimal::Decimal::new(4, 2)).unwrap_or(FeeRate::ZERO),
        )
    }
}
