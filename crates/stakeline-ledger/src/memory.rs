//! In-memory [`Store`] implementation.
//!
//! Each [`MemoryUnit`] holds an owned lock on the whole state for its
//! lifetime, which makes units fully serializable. Writes go into an overlay
//! and are copied into the state on commit; dropping the unit releases the
//! lock and discards the overlay.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use stakeline_types::{
    Game, GameId, Result, StakelineError, Transaction, TransactionKey, User, UserId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::{AtomicUnit, GameFilter, LedgerSnapshot, Store};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    games: HashMap<GameId, Game>,
    transactions: HashMap<TransactionKey, Transaction>,
    opening_supply: u128,
}

/// One-shot failure switches, armed only from test helpers.
#[derive(Debug, Default)]
struct Faults {
    commit: AtomicBool,
    user_write: AtomicBool,
}

/// Process-local store. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an account with an initial balance.
    ///
    /// Account custody lives outside the ledger, so the opening balance is
    /// tracked separately from deposits for supply audits.
    ///
    /// # Errors
    /// Returns [`StakelineError::Store`] if the account already exists.
    pub async fn register_user(&self, id: UserId, balance: u64) -> Result<User> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(&id) {
            return Err(StakelineError::Store(format!("user {id} already registered")));
        }
        let user = User::new(id.clone(), balance);
        state.users.insert(id, user.clone());
        state.opening_supply += u128::from(balance);
        Ok(user)
    }
}

/// Fault injection. **Tests only.**
#[cfg(any(test, feature = "test-helpers"))]
impl MemoryStore {
    /// Make the next [`AtomicUnit::commit`] fail, as a lost connection would.
    pub fn fail_next_commit(&self) {
        self.faults.commit.store(true, Ordering::SeqCst);
    }

    /// Make the next [`AtomicUnit::put_user`] inside any unit fail.
    pub fn fail_next_user_write(&self) {
        self.faults.user_write.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(MemoryUnit {
            state: guard,
            users: HashMap::new(),
            games: HashMap::new(),
            transactions: HashMap::new(),
            faults: Arc::clone(&self.faults),
        })
    }

    async fn user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn game(&self, id: GameId) -> Result<Option<Game>> {
        Ok(self.state.lock().await.games.get(&id).cloned())
    }

    async fn games(&self, filter: GameFilter) -> Result<Vec<Game>> {
        let state = self.state.lock().await;
        let mut games: Vec<Game> = state
            .games
            .values()
            .filter(|game| filter.matches(game))
            .cloned()
            .collect();
        match filter {
            GameFilter::Involving(_) => games.sort_by(|a, b| b.id.cmp(&a.id)),
            GameFilter::All | GameFilter::Active => games.sort_by_key(|game| game.id),
        }
        Ok(games)
    }

    async fn pending_transactions(&self) -> Result<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut pending: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|tx| tx.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|tx| tx.created_at);
        Ok(pending)
    }

    async fn snapshot(&self) -> Result<LedgerSnapshot> {
        let state = self.state.lock().await;
        Ok(LedgerSnapshot {
            users: state.users.values().cloned().collect(),
            games: state.games.values().cloned().collect(),
            transactions: state.transactions.values().cloned().collect(),
            opening_supply: state.opening_supply,
        })
    }
}

/// Atomic unit over a [`MemoryStore`].
pub struct MemoryUnit {
    state: OwnedMutexGuard<MemoryState>,
    users: HashMap<UserId, User>,
    games: HashMap<GameId, Game>,
    transactions: HashMap<TransactionKey, Transaction>,
    faults: Arc<Faults>,
}

#[async_trait]
impl AtomicUnit for MemoryUnit {
    async fn user(&mut self, id: &UserId) -> Result<Option<User>> {
        Ok(self
            .users
            .get(id)
            .or_else(|| self.state.users.get(id))
            .cloned())
    }

    async fn put_user(&mut self, user: User) -> Result<()> {
        if self.faults.user_write.swap(false, Ordering::SeqCst) {
            return Err(StakelineError::Store(format!(
                "write of user {} rejected: connection reset",
                user.id
            )));
        }
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn game(&mut self, id: GameId) -> Result<Option<Game>> {
        Ok(self
            .games
            .get(&id)
            .or_else(|| self.state.games.get(&id))
            .cloned())
    }

    async fn count_active_games_by_creator(&mut self, creator: &UserId) -> Result<usize> {
        let committed = self
            .state
            .games
            .values()
            .filter(|game| !self.games.contains_key(&game.id));
        let count = committed
            .chain(self.games.values())
            .filter(|game| game.is_active() && &game.creator == creator)
            .count();
        Ok(count)
    }

    async fn put_game(&mut self, game: Game) -> Result<()> {
        self.games.insert(game.id, game);
        Ok(())
    }

    async fn transaction(&mut self, key: &TransactionKey) -> Result<Option<Transaction>> {
        Ok(self
            .transactions
            .get(key)
            .or_else(|| self.state.transactions.get(key))
            .cloned())
    }

    async fn put_transaction(&mut self, tx: Transaction) -> Result<()> {
        self.transactions.insert(tx.key(), tx);
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        if self.faults.commit.swap(false, Ordering::SeqCst) {
            return Err(StakelineError::Store("commit rejected: injected failure".into()));
        }
        let state = &mut *self.state;
        state.users.extend(self.users.drain());
        state.games.extend(self.games.drain());
        state.transactions.extend(self.transactions.drain());
        Ok(())
    }
}
