//! Winner determination and payouts.
//!
//! Moves form a cycle: each beats exactly one other and loses to the
//! remaining one. Numerically the higher ordinal wins, except the (0, 2)
//! pair, which wraps around and is won by 0.
//!
//! | creator \ opponent | 0 rock | 1 paper | 2 scissors |
//! |--------------------|--------|---------|------------|
//! | 0 rock             | tie    | opp     | creator    |
//! | 1 paper            | creator| tie     | opp        |
//! | 2 scissors         | opp    | creator | tie        |

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stakeline_types::{FeeRate, Game, Move, Result, StakelineError, UserId};

/// Result of comparing two moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Tie,
    CreatorWins,
    OpponentWins,
}

impl Outcome {
    /// Compare the creator's move with the opponent's.
    #[must_use]
    pub fn decide(creator: Move, opponent: Move) -> Self {
        if creator == opponent {
            Self::Tie
        } else if beats(creator, opponent) {
            Self::CreatorWins
        } else {
            Self::OpponentWins
        }
    }

    /// The winning user, if any. The game must already have an opponent.
    pub fn winner(&self, game: &Game) -> Result<Option<UserId>> {
        match self {
            Self::Tie => Ok(None),
            Self::CreatorWins => Ok(Some(game.creator.clone())),
            Self::OpponentWins => game.opponent.clone().map(Some).ok_or_else(|| {
                StakelineError::SettlementFailure {
                    reason: format!("{} has no opponent to pay", game.id),
                }
            }),
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Tie => 0,
            Self::CreatorWins => 1,
            Self::OpponentWins => 2,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tie => write!(f, "TIE"),
            Self::CreatorWins => write!(f, "CREATOR_WINS"),
            Self::OpponentWins => write!(f, "OPPONENT_WINS"),
        }
    }
}

/// Whether `a` beats `b` in the cyclic relation.
#[must_use]
pub fn beats(a: Move, b: Move) -> bool {
    (a.ordinal() + 3 - b.ordinal()) % 3 == 1
}

/// Credits owed to each side when a game settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payouts {
    pub creator: u64,
    pub opponent: u64,
}

impl Payouts {
    /// A tie refunds both sides their stake plus fee. A decisive game pays the
    /// winner the pot minus the fee and the loser nothing.
    pub fn for_outcome(amount: u64, fee_rate: FeeRate, outcome: Outcome) -> Result<Self> {
        Ok(match outcome {
            Outcome::Tie => {
                let refund = fee_rate.stake_with_fee(amount)?;
                Self {
                    creator: refund,
                    opponent: refund,
                }
            }
            Outcome::CreatorWins => Self {
                creator: fee_rate.winner_payout(amount)?,
                opponent: 0,
            },
            Outcome::OpponentWins => Self {
                creator: 0,
                opponent: fee_rate.winner_payout(amount)?,
            },
        })
    }

    #[must_use]
    pub fn total(&self) -> u128 {
        u128::from(self.creator) + u128::from(self.opponent)
    }
}

/// SHA-256 over everything that determined a settlement.
///
/// Format: `"stakeline:settle:v1:" || game_id || amount || fee || creator ||
/// opponent || creator_move || opponent_move || outcome || payouts`.
/// Any node replaying the same inputs derives the same digest.
#[must_use]
pub fn settlement_digest(
    game: &Game,
    opponent_move: Move,
    outcome: Outcome,
    payouts: &Payouts,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"stakeline:settle:v1:");
    hasher.update(game.id.0.as_bytes());
    hasher.update(game.amount.to_le_bytes());
    hasher.update(game.fee_rate.as_decimal().normalize().to_string().as_bytes());
    hasher.update(game.creator.as_str().as_bytes());
    hasher.update([0u8]);
    if let Some(opponent) = &game.opponent {
        hasher.update(opponent.as_str().as_bytes());
    }
    hasher.update([0u8]);
    hasher.update([game.creator_move.ordinal(), opponent_move.ordinal(), outcome.code()]);
    hasher.update(payouts.creator.to_le_bytes());
    hasher.update(payouts.opponent.to_le_bytes());
    hasher.finalize().into()
}
