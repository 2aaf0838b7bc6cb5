//! Error types for the Stakeline wagering ledger.
//!
//! All errors use the `SL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Game errors
//! - 2xx: Balance errors
//! - 3xx: Fee errors
//! - 4xx: Deposit transaction errors
//! - 6xx: Settlement errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{GameId, GameStatus, TransactionKey, UserId};

/// Central error enum for all Stakeline operations.
#[derive(Debug, Error)]
pub enum StakelineError {
    // =================================================================
    // Game Errors (1xx)
    // =================================================================
    /// No game with this ID exists.
    #[error("SL_ERR_100: Game not found: {0}")]
    GameNotFound(GameId),

    /// The game already ended or was cancelled.
    #[error("SL_ERR_101: Game {game} is not active (status {status})")]
    GameNotActive { game: GameId, status: GameStatus },

    /// The creator tried to join their own game.
    #[error("SL_ERR_102: A user cannot join their own game")]
    SelfJoinForbidden,

    /// Someone other than the creator tried to cancel.
    #[error("SL_ERR_103: Only the creator of {0} may cancel it")]
    NotOwner(GameId),

    /// The creator already has the maximum number of open games.
    #[error("SL_ERR_104: Active game limit exceeded: at most {limit} open games per user")]
    ActiveGameLimitExceeded { limit: usize },

    /// A move outside rock (0), paper (1), scissors (2).
    #[error("SL_ERR_105: Invalid move: {0}")]
    InvalidMove(u8),

    /// Wager or transaction amount failed validation.
    #[error("SL_ERR_106: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// The caller cannot cover the stake plus fee.
    #[error("SL_ERR_200: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    /// A ledger delta would drive the balance negative.
    #[error(
        "SL_ERR_201: Insufficient funds: balance {balance} of {user} cannot absorb delta {delta}"
    )]
    InsufficientFunds {
        user: UserId,
        balance: u64,
        delta: i64,
    },

    /// No account exists for this identity.
    #[error("SL_ERR_202: User not found: {0}")]
    UserNotFound(UserId),

    /// Balance arithmetic left the representable range.
    #[error("SL_ERR_203: Amount overflow")]
    AmountOverflow,

    // =================================================================
    // Fee Errors (3xx)
    // =================================================================
    /// Fee rate outside `[0, 1)`.
    #[error("SL_ERR_300: Invalid fee rate: {reason}")]
    InvalidFeeRate { reason: String },

    // =================================================================
    // Deposit Transaction Errors (4xx)
    // =================================================================
    /// A transaction with the same owner and signature is already recorded.
    #[error("SL_ERR_400: Transaction already recorded: {0}")]
    DuplicateTransaction(TransactionKey),

    /// The transaction is not in the store.
    #[error("SL_ERR_401: Transaction not found: {0}")]
    TransactionNotFound(TransactionKey),

    /// The chain-status collaborator could not answer.
    #[error("SL_ERR_402: Chain status unavailable: {reason}")]
    ChainStatus { reason: String },

    // =================================================================
    // Settlement Errors (6xx)
    // =================================================================
    /// The atomic unit could not commit. Nothing was applied; safe to retry.
    #[error("SL_ERR_600: Settlement failed: {reason}")]
    SettlementFailure { reason: String },

    /// Supply conservation invariant violated. The ledger must halt.
    #[error("SL_ERR_601: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// The persistence layer rejected an operation.
    #[error("SL_ERR_900: Store error: {0}")]
    Store(String),

    /// Configuration error (invalid config file, out-of-range values, etc.).
    #[error("SL_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("SL_ERR_903: I/O error: {0}")]
    Io(String),
}

impl StakelineError {
    /// Whether this error came from the store rather than from validation.
    ///
    /// Store failures abort the whole atomic unit, so retrying the entire
    /// operation is safe.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::SettlementFailure { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, StakelineError>;

impl From<std::io::Error> for StakelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
