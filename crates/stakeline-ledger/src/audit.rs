//! Supply conservation invariant checker.
//!
//! Mathematical invariant over a committed snapshot:
//! ```text
//! Σ balances + Σ escrow(active games) + Σ retained fees(ended games)
//!     == opening supply + Σ confirmed deposits − Σ confirmed withdrawals
//! ```
//!
//! Games only move money between players, the escrow held by open games, and
//! the platform's fee take. If the two sides ever disagree, money appeared or
//! vanished and the ledger must stop.

use stakeline_types::{Game, GameStatus, Result, StakelineError, TxKind, TxStatus};

use crate::store::LedgerSnapshot;

/// Totals computed from a [`LedgerSnapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupplyReport {
    pub balances: u128,
    /// Stake plus fee held for games nobody has joined yet.
    pub escrowed: u128,
    /// Fees kept from decisive games.
    pub retained_fees: u128,
    pub opening_supply: u128,
    pub deposits: u128,
    pub withdrawals: u128,
}

impl SupplyReport {
    /// Tally a snapshot.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if a game's fee arithmetic overflows.
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Result<Self> {
        let mut report = Self {
            opening_supply: snapshot.opening_supply,
            ..Self::default()
        };

        for user in &snapshot.users {
            report.balances += u128::from(user.balance);
        }
        for game in &snapshot.games {
            report.escrowed += u128::from(escrow_of(game)?);
            report.retained_fees += u128::from(retained_by(game)?);
        }
        for tx in snapshot
            .transactions
            .iter()
            .filter(|tx| tx.status == TxStatus::Confirmed)
        {
            match tx.kind {
                TxKind::Deposit => report.deposits += u128::from(tx.amount),
                TxKind::Withdraw => report.withdrawals += u128::from(tx.amount),
            }
        }
        Ok(report)
    }

    /// What the ledger holds or has paid out as fees.
    #[must_use]
    pub fn actual_supply(&self) -> u128 {
        self.balances + self.escrowed + self.retained_fees
    }

    /// What has entered the ledger minus what has left it.
    ///
    /// Signed: withdrawals can exceed deposits when accounts were opened with
    /// a balance.
    #[must_use]
    pub fn expected_supply(&self) -> i128 {
        to_i128(self.opening_supply) + to_i128(self.deposits) - to_i128(self.withdrawals)
    }

    /// # Errors
    /// Returns [`StakelineError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self) -> Result<()> {
        let actual = self.actual_supply();
        let expected = self.expected_supply();
        if to_i128(actual) != expected {
            return Err(StakelineError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual} (balances={}, escrowed={}, fees={}) != expected \
                     {expected} (opening={}, deposits={}, withdrawals={})",
                    self.balances,
                    self.escrowed,
                    self.retained_fees,
                    self.opening_supply,
                    self.deposits,
                    self.withdrawals,
                ),
            });
        }
        Ok(())
    }
}

/// Tally and verify in one step.
pub fn verify_supply(snapshot: &LedgerSnapshot) -> Result<SupplyReport> {
    let report = SupplyReport::from_snapshot(snapshot)?;
    report.verify()?;
    Ok(report)
}

fn escrow_of(game: &Game) -> Result<u64> {
    match game.status {
        GameStatus::Active => game.stake_with_fee(),
        GameStatus::Ended | GameStatus::Cancelled => Ok(0),
    }
}

fn retained_by(game: &Game) -> Result<u64> {
    match (game.status, &game.winner) {
        (GameStatus::Ended, Some(_)) => game.fee_rate.retained_on_decisive(game.amount),
        _ => Ok(0),
    }
}

fn to_i128(value: u128) -> i128 {
    i128::try_from(value).unwrap_or(i128::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stakeline_types::{Transaction, TxSignature, User, UserId};

    fn alice() -> UserId {
        UserId::new("alice")
    }

    #[test]
    fn empty_snapshot_balances() {
        let report = verify_supply(&LedgerSnapshot::default()).unwrap();
        assert_eq!(report.actual_supply(), 0);
        assert_eq!(report.expected_supply(), 0);
    }

    #[test]
    fn confirmed_deposits_count_pending_do_not() {
        let mut confirmed =
            Transaction::pending(alice(), TxSignature::new("a"), TxKind::Deposit, 300);
        confirmed.mark_confirmed(Utc::now()).unwrap();
        let pending = Transaction::pending(alice(), TxSignature::new("b"), TxKind::Deposit, 999);

        let snapshot = LedgerSnapshot {
            users: vec![User::new(alice(), 300)],
            transactions: vec![confirmed, pending],
            ..LedgerSnapshot::default()
        };
        let report = verify_supply(&snapshot).unwrap();
        assert_eq!(report.deposits, 300);
    }

    #[test]
    fn open_game_escrow_is_counted() {
        // Opened with 1000, staked 104 on an open game.
        let game = Game::dummy(alice(), 100);
        let snapshot = LedgerSnapshot {
            users: vec![User::new(alice(), 896)],
            games: vec![game],
            opening_supply: 1000,
            ..LedgerSnapshot::default()
        };
        let report = verify_supply(&snapshot).unwrap();
        assert_eq!(report.escrowed, 104);
    }

    #[test]
    fn decisive_game_retains_fee() {
        let bob = UserId::new("bob");
        let mut game = Game::dummy(alice(), 100);
        game.opponent = Some(bob.clone());
        game.record_winner(alice()).unwrap();
        game.mark_ended(Utc::now()).unwrap();

        // Both paid 104, alice won 192: 1000 - 104 + 192 and 1000 - 104.
        let snapshot = LedgerSnapshot {
            users: vec![User::new(alice(), 1088), User::new(bob, 896)],
            games: vec![game],
            opening_supply: 2000,
            ..LedgerSnapshot::default()
        };
        let report = verify_supply(&snapshot).unwrap();
        assert_eq!(report.retained_fees, 16);
    }

    #[test]
    fn tie_retains_nothing() {
        let mut game = Game::dummy(alice(), 100);
        game.opponent = Some(UserId::new("bob"));
        game.mark_ended(Utc::now()).unwrap();
        assert_eq!(retained_by(&game).unwrap(), 0);
    }

    #[test]
    fn detects_minted_money() {
        let snapshot = LedgerSnapshot {
            users: vec![User::new(alice(), 1001)],
            opening_supply: 1000,
            ..LedgerSnapshot::default()
        };
        let err = verify_supply(&snapshot).unwrap_err();
        assert!(matches!(
            err,
            StakelineError::SupplyInvariantViolation { .. }
        ));
    }
}
