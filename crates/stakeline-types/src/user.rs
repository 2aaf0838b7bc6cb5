//! Account balance types.
//!
//! A user holds a single non-negative balance in the smallest currency unit.
//! Nothing writes it directly: every change goes through a signed ledger delta.

use serde::{Deserialize, Serialize};

use crate::{Result, StakelineError, UserId};

/// A user account and its spendable balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub balance: u64,
}

impl User {
    #[must_use]
    pub fn new(id: UserId, balance: u64) -> Self {
        Self { id, balance }
    }

    /// Balance after applying `delta`, or an error if it would go negative.
    ///
    /// Does not mutate: the ledger decides when to persist the result.
    ///
    /// # Errors
    /// - `InsufficientFunds` if a debit exceeds the balance
    /// - `AmountOverflow` if a credit overflows
    pub fn balance_after(&self, delta: i64) -> Result<u64> {
        let magnitude = delta.unsigned_abs();
        if delta >= 0 {
            self.balance
                .checked_add(magnitude)
                .ok_or(StakelineError::AmountOverflow)
        } else {
            self.balance
                .checked_sub(magnitude)
                .ok_or_else(|| StakelineError::InsufficientFunds {
                    user: self.id.clone(),
                    balance: self.balance,
                    delta,
                })
        }
    }

    #[must_use]
    pub fn can_afford(&self, amount: u64) -> bool {
        self.balance >= amount
    }
}

/// Convert an unsigned amount to a credit delta.
pub fn credit(amount: u64) -> Result<i64> {
    i64::try_from(amount).map_err(|_| StakelineError::AmountOverflow)
}

/// Convert an unsigned amount to a debit delta.
pub fn debit(amount: u64) -> Result<i64> {
    credit(amount).map(i64::wrapping_neg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice(balance: u64) -> User {
        User::new(UserId::new("alice"), balance)
    }

    #[test]
    fn credit_increases_balance() {
        assert_eq!(alice(100).balance_after(50).unwrap(), 150);
    }

    #[test]
    fn debit_to_zero_is_allowed() {
        assert_eq!(alice(104).balance_after(-104).unwrap(), 0);
    }

    #[test]
    fn overdraft_is_rejected() {
        let err = alice(100).balance_after(-104).unwrap_err();
        assert!(matches!(
            err,
            StakelineError::InsufficientFunds {
                balance: 100,
                delta: -104,
                ..
            }
        ));
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let err = alice(u64::MAX).balance_after(1).unwrap_err();
        assert!(matches!(err, StakelineError::AmountOverflow));
    }

    #[test]
    fn i64_min_debit_does_not_panic() {
        assert!(alice(0).balance_after(i64::MIN).is_err());
    }

    #[test]
    fn delta_helpers() {
        assert_eq!(credit(104).unwrap(), 104);
        assert_eq!(debit(104).unwrap(), -104);
        assert!(credit(u64::MAX).is_err());
    }
}
