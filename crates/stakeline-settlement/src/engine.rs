//! The game settlement engine.
//!
//! Every transition runs inside one ledger transaction: the status read, the
//! precondition checks, the balance deltas and the game write commit together
//! or not at all. Because units are serializable, two joins racing for the
//! same game cannot both see it ACTIVE, and two creates racing at the
//! active-game cap cannot both pass the count.
//!
//! Notifications are published by the ledger only after commit.

use chrono::Utc;
use stakeline_ledger::{AtomicUnit, GameFilter, Ledger, LedgerTxn, Notify, Store};
use stakeline_types::{
    EngineConfig, Game, GameId, Notification, Result, StakelineError, User, UserId, user,
};

use crate::rules::{Outcome, Payouts, settlement_digest};
use crate::validation::{CreateGameRequest, JoinGameRequest, validate_create, validate_join};

/// Drives the wager lifecycle: create → join (settle), or create → cancel.
pub struct GameEngine<S: Store> {
    ledger: Ledger<S>,
    config: EngineConfig,
}

impl<S: Store> Clone for GameEngine<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> GameEngine<S> {
    #[must_use]
    pub fn new(ledger: Ledger<S>, config: EngineConfig) -> Self {
        Self { ledger, config }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =================================================================
    // Transitions
    // =================================================================

    /// Open a new game, debiting the creator's stake plus fee.
    ///
    /// # Errors
    /// - `InvalidAmount` / `InvalidMove` from validation
    /// - `UserNotFound`, `InsufficientBalance`, `ActiveGameLimitExceeded`
    /// - `SettlementFailure` if the store failed inside the unit
    pub async fn create_game(&self, creator: &UserId, request: &CreateGameRequest) -> Result<Game> {
        let input = validate_create(request)?;
        let mut txn = self.ledger.begin().await.map_err(into_settlement_failure)?;

        let account = load_user(&mut txn, creator).await?;
        let game = Game::open(
            creator.clone(),
            input.amount,
            input.player_move,
            self.config.fee_rate,
        );
        let cost = game.stake_with_fee()?;
        if !account.can_afford(cost) {
            return Err(reject(StakelineError::InsufficientBalance {
                needed: cost,
                available: account.balance,
            }));
        }

        let open = txn
            .unit()
            .count_active_games_by_creator(creator)
            .await
            .map_err(into_settlement_failure)?;
        if open >= self.config.max_active_games {
            return Err(reject(StakelineError::ActiveGameLimitExceeded {
                limit: self.config.max_active_games,
            }));
        }

        txn.apply_delta(creator, user::debit(cost)?, Notify::Balance)
            .await
            .map_err(into_settlement_failure)?;
        txn.unit()
            .put_game(game.clone())
            .await
            .map_err(into_settlement_failure)?;
        txn.stage(Notification::GameCreated { game: game.clone() });

        self.ledger
            .commit(txn)
            .await
            .map_err(into_settlement_failure)?;

        tracing::info!(
            game = %game.id,
            creator = %creator,
            amount = game.amount,
            fee = %game.fee_rate,
            debited = cost,
            "Game created"
        );
        Ok(game)
    }

    /// Join an open game and settle it in the same unit.
    ///
    /// # Errors
    /// - `InvalidMove` from validation
    /// - `GameNotFound`, `GameNotActive`, `SelfJoinForbidden`
    /// - `UserNotFound`, `InsufficientBalance`
    /// - `SettlementFailure` if the store failed inside the unit
    pub async fn join_game(
        &self,
        opponent: &UserId,
        game_id: GameId,
        request: &JoinGameRequest,
    ) -> Result<Game> {
        let opponent_move = validate_join(request)?;
        let mut txn = self.ledger.begin().await.map_err(into_settlement_failure)?;

        let mut game = load_game(&mut txn, game_id).await?;
        game.ensure_active().map_err(reject)?;
        if &game.creator == opponent {
            tracing::warn!(
                game = %game.id,
                user = %opponent,
                "Self-join blocked: creator tried to join own game"
            );
            return Err(StakelineError::SelfJoinForbidden);
        }

        let account = load_user(&mut txn, opponent).await?;
        let cost = game.stake_with_fee()?;
        if !account.can_afford(cost) {
            return Err(reject(StakelineError::InsufficientBalance {
                needed: cost,
                available: account.balance,
            }));
        }
        txn.apply_delta(opponent, user::debit(cost)?, Notify::Balance)
            .await
            .map_err(into_settlement_failure)?;

        game.opponent = Some(opponent.clone());
        game.opponent_move = Some(opponent_move);

        let outcome = Outcome::decide(game.creator_move, opponent_move);
        let payouts = Payouts::for_outcome(game.amount, game.fee_rate, outcome)?;
        if let Some(winner) = outcome.winner(&game)? {
            game.record_winner(winner)?;
        }
        let digest = settlement_digest(&game, opponent_move, outcome, &payouts);
        game.settlement_digest = Some(digest);
        game.mark_ended(Utc::now())?;

        let creator = game.creator.clone();
        credit(&mut txn, &creator, payouts.creator).await?;
        credit(&mut txn, opponent, payouts.opponent).await?;

        txn.unit()
            .put_game(game.clone())
            .await
            .map_err(into_settlement_failure)?;
        txn.stage(Notification::GameUpdated { game: game.clone() });

        self.ledger
            .commit(txn)
            .await
            .map_err(into_settlement_failure)?;

        tracing::info!(
            game = %game.id,
            creator = %creator,
            opponent = %opponent,
            outcome = %outcome,
            creator_payout = payouts.creator,
            opponent_payout = payouts.opponent,
            digest = hex::encode(digest),
            "Game settled"
        );
        Ok(game)
    }

    /// Cancel an open game and refund the creator's stake plus fee.
    ///
    /// # Errors
    /// - `GameNotFound`, `NotOwner`, `GameNotActive`
    /// - `SettlementFailure` if the store failed inside the unit
    pub async fn cancel_game(&self, caller: &UserId, game_id: GameId) -> Result<Game> {
        let mut txn = self.ledger.begin().await.map_err(into_settlement_failure)?;

        let mut game = load_game(&mut txn, game_id).await?;
        if &game.creator != caller {
            return Err(reject(StakelineError::NotOwner(game_id)));
        }
        game.ensure_active().map_err(reject)?;

        let refund = game.stake_with_fee()?;
        game.mark_cancelled(Utc::now())?;
        credit(&mut txn, caller, refund).await?;

        txn.unit()
            .put_game(game.clone())
            .await
            .map_err(into_settlement_failure)?;
        txn.stage(Notification::GameUpdated { game: game.clone() });

        self.ledger
            .commit(txn)
            .await
            .map_err(into_settlement_failure)?;

        tracing::info!(game = %game.id, creator = %caller, refund, "Game cancelled");
        Ok(game)
    }

    // =================================================================
    // Queries
    // =================================================================

    pub async fn game(&self, id: GameId) -> Result<Game> {
        self.ledger
            .store()
            .game(id)
            .await?
            .ok_or(StakelineError::GameNotFound(id))
    }

    /// Open games, oldest first.
    pub async fn active_games(&self) -> Result<Vec<Game>> {
        self.ledger.store().games(GameFilter::Active).await
    }

    /// Every game the user created or joined, newest first.
    pub async fn games_for_user(&self, user: &UserId) -> Result<Vec<Game>> {
        self.ledger
            .store()
            .games(GameFilter::Involving(user.clone()))
            .await
    }

    pub async fn user(&self, id: &UserId) -> Result<User> {
        self.ledger
            .store()
            .user(id)
            .await?
            .ok_or_else(|| StakelineError::UserNotFound(id.clone()))
    }
}

async fn load_user<U: AtomicUnit>(txn: &mut LedgerTxn<U>, id: &UserId) -> Result<User> {
    txn.unit()
        .user(id)
        .await
        .map_err(into_settlement_failure)?
        .ok_or_else(|| reject(StakelineError::UserNotFound(id.clone())))
}

async fn load_game<U: AtomicUnit>(txn: &mut LedgerTxn<U>, id: GameId) -> Result<Game> {
    txn.unit()
        .game(id)
        .await
        .map_err(into_settlement_failure)?
        .ok_or_else(|| reject(StakelineError::GameNotFound(id)))
}

async fn credit<U: AtomicUnit>(txn: &mut LedgerTxn<U>, to: &UserId, amount: u64) -> Result<()> {
    if amount > 0 {
        txn.apply_delta(to, user::credit(amount)?, Notify::Balance)
            .await
            .map_err(into_settlement_failure)?;
    }
    Ok(())
}

/// Store-level failures abort the transition as a whole.
fn into_settlement_failure(err: StakelineError) -> StakelineError {
    match err {
        StakelineError::Store(reason) => {
            tracing::warn!(%reason, "Atomic unit aborted");
            StakelineError::SettlementFailure { reason }
        }
        other => other,
    }
}

fn reject(err: StakelineError) -> StakelineError {
    tracing::debug!(error = %err, "Game action rejected");
    err
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stakeline_ledger::{MemoryStore, RecordingNotifier, verify_supply};
    use stakeline_types::GameStatus;

    use super::*;

    struct Fixture {
        engine: GameEngine<MemoryStore>,
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store.register_user(alice(), 1000).await.unwrap();
        store.register_user(bob(), 1000).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let ledger = Ledger::new(Arc::clone(&store), notifier.clone());
        Fixture {
            engine: GameEngine::new(ledger, EngineConfig::default()),
            store,
            notifier,
        }
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn bob() -> UserId {
        UserId::new("bob")
    }

    fn create(amount: u64, player_move: u8) -> CreateGameRequest {
        CreateGameRequest {
            amount,
            player_move,
        }
    }

    fn join(player_move: u8) -> JoinGameRequest {
        JoinGameRequest { player_move }
    }

    async fn balance(fx: &Fixture, user: &UserId) -> u64 {
        fx.engine.user(user).await.unwrap().balance
    }

    #[tokio::test]
    async fn create_debits_stake_plus_fee() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();

        assert_eq!(game.status, GameStatus::Active);
        assert_eq!(game.creator_move, stakeline_types::Move::Rock);
        assert_eq!(balance(&fx, &alice()).await, 896);

        let events = fx.notifier.events();
        assert_eq!(events.len(), 2);
        assert_eq!(fx.notifier.balance_events_for(&alice()), vec![(896, false)]);
        assert!(matches!(&events[1], Notification::GameCreated { game: g } if g.id == game.id));
    }

    #[tokio::test]
    async fn decisive_join_pays_winner() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        let settled = fx.engine.join_game(&bob(), game.id, &join(1)).await.unwrap();

        assert_eq!(settled.status, GameStatus::Ended);
        assert_eq!(settled.winner, Some(bob()));
        assert_eq!(settled.opponent, Some(bob()));
        assert!(settled.settlement_digest.is_some());
        assert!(settled.ended_at.is_some());

        assert_eq!(balance(&fx, &alice()).await, 896);
        assert_eq!(balance(&fx, &bob()).await, 1000 - 104 + 192);
        // Debit then credit, each announced.
        assert_eq!(
            fx.notifier.balance_events_for(&bob()),
            vec![(896, false), (1088, false)]
        );
    }

    #[tokio::test]
    async fn creator_can_win() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        let settled = fx.engine.join_game(&bob(), game.id, &join(2)).await.unwrap();
        assert_eq!(settled.winner, Some(alice()));
        assert_eq!(balance(&fx, &alice()).await, 896 + 192);
        assert_eq!(balance(&fx, &bob()).await, 896);
    }

    #[tokio::test]
    async fn tie_refunds_both() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 1)).await.unwrap();
        let settled = fx.engine.join_game(&bob(), game.id, &join(1)).await.unwrap();

        assert_eq!(settled.status, GameStatus::Ended);
        assert_eq!(settled.winner, None);
        assert_eq!(balance(&fx, &alice()).await, 1000);
        assert_eq!(balance(&fx, &bob()).await, 1000);
    }

    #[tokio::test]
    async fn cancel_refunds_creator() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        let cancelled = fx.engine.cancel_game(&alice(), game.id).await.unwrap();

        assert_eq!(cancelled.status, GameStatus::Cancelled);
        assert_eq!(balance(&fx, &alice()).await, 1000);
        assert!(fx.engine.active_games().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_by_non_owner_rejected() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        let err = fx.engine.cancel_game(&bob(), game.id).await.unwrap_err();
        assert!(matches!(err, StakelineError::NotOwner(id) if id == game.id));
        assert!(fx.engine.game(game.id).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn cancel_after_end_rejected() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        fx.engine.join_game(&bob(), game.id, &join(1)).await.unwrap();
        let err = fx.engine.cancel_game(&alice(), game.id).await.unwrap_err();
        assert!(matches!(
            err,
            StakelineError::GameNotActive {
                status: GameStatus::Ended,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn self_join_forbidden() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        let err = fx.engine.join_game(&alice(), game.id, &join(1)).await.unwrap_err();
        assert!(matches!(err, StakelineError::SelfJoinForbidden));
        assert_eq!(balance(&fx, &alice()).await, 896);
    }

    #[tokio::test]
    async fn second_join_rejected() {
        let fx = fixture().await;
        fx.store.register_user(UserId::new("carol"), 1000).await.unwrap();
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        fx.engine.join_game(&bob(), game.id, &join(1)).await.unwrap();

        let err = fx
            .engine
            .join_game(&UserId::new("carol"), game.id, &join(2))
            .await
            .unwrap_err();
        assert!(matches!(err, StakelineError::GameNotActive { .. }));
        assert_eq!(balance(&fx, &UserId::new("carol")).await, 1000);
    }

    #[tokio::test]
    async fn unknown_game_and_user() {
        let fx = fixture().await;
        let err = fx
            .engine
            .join_game(&bob(), GameId::new(), &join(0))
            .await
            .unwrap_err();
        assert!(matches!(err, StakelineError::GameNotFound(_)));

        let err = fx
            .engine
            .create_game(&UserId::new("ghost"), &create(1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StakelineError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn insufficient_balance_rejected_without_effects() {
        let fx = fixture().await;
        let err = fx.engine.create_game(&alice(), &create(1000, 0)).await.unwrap_err();
        assert!(matches!(
            err,
            StakelineError::InsufficientBalance {
                needed: 1040,
                available: 1000
            }
        ));
        assert_eq!(balance(&fx, &alice()).await, 1000);
        assert!(fx.notifier.events().is_empty());
    }

    #[tokio::test]
    async fn opponent_needs_stake_plus_fee() {
        let fx = fixture().await;
        fx.store.register_user(UserId::new("dave"), 103).await.unwrap();
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        let err = fx
            .engine
            .join_game(&UserId::new("dave"), game.id, &join(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StakelineError::InsufficientBalance { needed: 104, .. }));
        assert!(fx.engine.game(game.id).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn active_game_cap_enforced() {
        let fx = fixture().await;
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(fx.engine.create_game(&alice(), &create(10, 0)).await.unwrap().id);
        }
        let err = fx.engine.create_game(&alice(), &create(10, 0)).await.unwrap_err();
        assert!(matches!(err, StakelineError::ActiveGameLimitExceeded { limit: 5 }));

        // Ending one frees a slot.
        fx.engine.cancel_game(&alice(), ids[0]).await.unwrap();
        fx.engine.create_game(&alice(), &create(10, 0)).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_requests_rejected() {
        let fx = fixture().await;
        let err = fx.engine.create_game(&alice(), &create(0, 0)).await.unwrap_err();
        assert!(matches!(err, StakelineError::InvalidAmount { .. }));
        let err = fx.engine.create_game(&alice(), &create(10, 7)).await.unwrap_err();
        assert!(matches!(err, StakelineError::InvalidMove(7)));
    }

    #[tokio::test]
    async fn failed_commit_leaves_no_trace() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        fx.notifier.take();

        fx.store.fail_next_commit();
        let err = fx.engine.join_game(&bob(), game.id, &join(1)).await.unwrap_err();
        assert!(matches!(err, StakelineError::SettlementFailure { .. }));

        assert!(fx.engine.game(game.id).await.unwrap().is_active());
        assert_eq!(balance(&fx, &bob()).await, 1000);
        assert!(fx.notifier.events().is_empty());

        // Retrying succeeds.
        fx.engine.join_game(&bob(), game.id, &join(1)).await.unwrap();
    }

    #[tokio::test]
    async fn store_failure_during_create_aborts() {
        let fx = fixture().await;
        fx.store.fail_next_user_write();

        let err = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap_err();
        assert!(matches!(err, StakelineError::SettlementFailure { .. }), "{err:?}");
        assert_eq!(balance(&fx, &alice()).await, 1000);
        assert!(fx.engine.games_for_user(&alice()).await.unwrap().is_empty());
        assert!(fx.notifier.events().is_empty());
    }

    #[tokio::test]
    async fn store_failure_during_join_aborts() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        fx.notifier.take();
        fx.store.fail_next_user_write();

        let err = fx.engine.join_game(&bob(), game.id, &join(1)).await.unwrap_err();
        assert!(matches!(err, StakelineError::SettlementFailure { .. }), "{err:?}");
        let stored = fx.engine.game(game.id).await.unwrap();
        assert!(stored.is_active());
        assert_eq!(stored.opponent, None);
        assert_eq!(balance(&fx, &alice()).await, 896);
        assert_eq!(balance(&fx, &bob()).await, 1000);
        assert!(fx.notifier.events().is_empty());
    }

    #[tokio::test]
    async fn store_failure_during_cancel_aborts() {
        let fx = fixture().await;
        let game = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        fx.notifier.take();
        fx.store.fail_next_user_write();

        let err = fx.engine.cancel_game(&alice(), game.id).await.unwrap_err();
        assert!(matches!(err, StakelineError::SettlementFailure { .. }), "{err:?}");
        assert!(fx.engine.game(game.id).await.unwrap().is_active());
        assert_eq!(balance(&fx, &alice()).await, 896);
        assert!(fx.notifier.events().is_empty());

        // The switch is one-shot; a retry goes through.
        fx.engine.cancel_game(&alice(), game.id).await.unwrap();
        assert_eq!(balance(&fx, &alice()).await, 1000);
    }

    #[tokio::test]
    async fn queries_list_games() {
        let fx = fixture().await;
        let first = fx.engine.create_game(&alice(), &create(10, 0)).await.unwrap();
        let second = fx.engine.create_game(&bob(), &create(10, 0)).await.unwrap();
        fx.engine.join_game(&alice(), second.id, &join(0)).await.unwrap();

        let active = fx.engine.active_games().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, first.id);

        let mine = fx.engine.games_for_user(&alice()).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second.id, "newest first");
        assert_eq!(fx.engine.games_for_user(&bob()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn supply_conserved_across_lifecycle() {
        let fx = fixture().await;
        let a = fx.engine.create_game(&alice(), &create(100, 0)).await.unwrap();
        let b = fx.engine.create_game(&alice(), &create(50, 2)).await.unwrap();
        let c = fx.engine.create_game(&bob(), &create(33, 1)).await.unwrap();
        verify_supply(&fx.store.snapshot().await.unwrap()).unwrap();

        fx.engine.join_game(&bob(), a.id, &join(1)).await.unwrap();
        fx.engine.join_game(&bob(), b.id, &join(2)).await.unwrap();
        fx.engine.cancel_game(&bob(), c.id).await.unwrap();

        let report = verify_supply(&fx.store.snapshot().await.unwrap()).unwrap();
        assert_eq!(report.escrowed, 0);
        assert_eq!(report.retained_fees, 16);
    }
}
