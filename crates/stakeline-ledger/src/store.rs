//! Persistence seams.
//!
//! A [`Store`] hands out [`AtomicUnit`]s. Everything written through a unit is
//! invisible to other readers until [`AtomicUnit::commit`] succeeds, and
//! dropping a unit without committing discards it. Reads through a unit see
//! the unit's own staged writes.
//!
//! Implementations must make units serializable with respect to each other:
//! a unit that reads a game's status and then writes the game must not
//! interleave with another unit doing the same. A database transaction at
//! `SERIALIZABLE`, or a version check with conflict detection, both qualify.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stakeline_types::{Game, GameId, Result, Transaction, TransactionKey, User, UserId};

/// Which games a read-side query returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameFilter {
    All,
    /// Open games, oldest first.
    Active,
    /// Games where the user is creator or opponent, newest first.
    Involving(UserId),
}

impl GameFilter {
    #[must_use]
    pub fn matches(&self, game: &Game) -> bool {
        match self {
            Self::All => true,
            Self::Active => game.is_active(),
            Self::Involving(user) => game.involves(user),
        }
    }
}

/// Point-in-time copy of everything the ledger owns, for audits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub users: Vec<User>,
    pub games: Vec<Game>,
    pub transactions: Vec<Transaction>,
    /// Sum of balances accounts were opened with (outside any deposit).
    pub opening_supply: u128,
}

/// A group of reads and writes that commits or fails as one.
#[async_trait]
pub trait AtomicUnit: Send {
    async fn user(&mut self, id: &UserId) -> Result<Option<User>>;

    async fn put_user(&mut self, user: User) -> Result<()>;

    async fn game(&mut self, id: GameId) -> Result<Option<Game>>;

    /// Active games created by `creator`, counting this unit's staged writes.
    async fn count_active_games_by_creator(&mut self, creator: &UserId) -> Result<usize>;

    async fn put_game(&mut self, game: Game) -> Result<()>;

    async fn transaction(&mut self, key: &TransactionKey) -> Result<Option<Transaction>>;

    async fn put_transaction(&mut self, tx: Transaction) -> Result<()>;

    /// Apply every staged write, or none of them.
    async fn commit(self) -> Result<()>;
}

/// Source of atomic units plus committed-state reads.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Unit: AtomicUnit + 'static;

    /// Open a new atomic unit.
    async fn begin(&self) -> Result<Self::Unit>;

    async fn user(&self, id: &UserId) -> Result<Option<User>>;

    async fn game(&self, id: GameId) -> Result<Option<Game>>;

    async fn games(&self, filter: GameFilter) -> Result<Vec<Game>>;

    /// Every transaction still waiting for chain confirmation.
    async fn pending_transactions(&self) -> Result<Vec<Transaction>>;

    async fn snapshot(&self) -> Result<LedgerSnapshot>;
}
