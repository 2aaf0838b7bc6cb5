//! Request validation.
//!
//! Raw client input is turned into typed values here, before the engine opens
//! an atomic unit. Nothing past this point handles an unchecked move or a
//! zero stake.

use serde::{Deserialize, Serialize};
use stakeline_types::{Move, Result, StakelineError};

/// Body of a create-game request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameRequest {
    pub amount: u64,
    #[serde(rename = "move")]
    pub player_move: u8,
}

/// Body of a join-game request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGameRequest {
    #[serde(rename = "move")]
    pub player_move: u8,
}

/// A create request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidCreate {
    pub amount: u64,
    pub player_move: Move,
}

/// # Errors
/// - `InvalidAmount` for a zero stake or one too large to debit
/// - `InvalidMove` for a move outside 0..=2
pub fn validate_create(request: &CreateGameRequest) -> Result<ValidCreate> {
    if request.amount == 0 {
        return Err(StakelineError::InvalidAmount {
            reason: "wager must be greater than zero".into(),
        });
    }
    if i64::try_from(request.amount).is_err() {
        return Err(StakelineError::InvalidAmount {
            reason: format!("wager {} exceeds the ledger range", request.amount),
        });
    }
    Ok(ValidCreate {
        amount: request.amount,
        player_move: Move::try_from(request.player_move)?,
    })
}

/// # Errors
/// Returns `InvalidMove` for a move outside 0..=2.
pub fn validate_join(request: &JoinGameRequest) -> Result<Move> {
    Move::try_from(request.player_move)
}
