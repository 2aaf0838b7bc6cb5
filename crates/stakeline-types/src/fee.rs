//! Platform fee arithmetic.
//!
//! Both sides pay `amount × (1 + fee)` when they commit to a game. A decisive
//! game pays the winner `amount × 2 × (1 − fee)` and the platform keeps the
//! difference. A tie refunds each side exactly what it paid, so no fee is
//! retained.
//!
//! Results are rounded half away from zero to whole units.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{Result, StakelineError};

/// Fee rate applied to each side's stake, in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct FeeRate(Decimal);

impl FeeRate {
    /// No fee at all.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Validate and wrap a fee rate.
    ///
    /// # Errors
    /// Returns [`StakelineError::InvalidFeeRate`] unless `0 <= rate < 1`.
    pub fn new(rate: Decimal) -> Result<Self> {
        if rate < Decimal::ZERO {
            return Err(StakelineError::InvalidFeeRate {
                reason: format!("{rate} is negative"),
            });
        }
        if rate >= Decimal::ONE {
            return Err(StakelineError::InvalidFeeRate {
                reason: format!("{rate} would consume the whole pot"),
            });
        }
        Ok(Self(rate))
    }

    /// Fee rate from whole basis points (`400` = 4%).
    ///
    /// # Errors
    /// Same as [`FeeRate::new`].
    pub fn from_bps(bps: u32) -> Result<Self> {
        Self::new(Decimal::new(i64::from(bps), 4))
    }

    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// What one side pays to enter a game: `round(amount × (1 + fee))`.
    pub fn stake_with_fee(&self, amount: u64) -> Result<u64> {
        let total = Decimal::from(amount)
            .checked_mul(Decimal::ONE + self.0)
            .ok_or(StakelineError::AmountOverflow)?;
        to_units(total)
    }

    /// What the winner of a decisive game receives: `round(amount × 2 × (1 − fee))`.
    pub fn winner_payout(&self, amount: u64) -> Result<u64> {
        let pot = Decimal::from(amount)
            .checked_mul(Decimal::TWO)
            .and_then(|pot| pot.checked_mul(Decimal::ONE - self.0))
            .ok_or(StakelineError::AmountOverflow)?;
        to_units(pot)
    }

    /// What the platform keeps from a decisive game: both stakes minus the payout.
    pub fn retained_on_decisive(&self, amount: u64) -> Result<u64> {
        let paid_in = self
            .stake_with_fee(amount)?
            .checked_mul(2)
            .ok_or(StakelineError::AmountOverflow)?;
        paid_in
            .checked_sub(self.winner_payout(amount)?)
            .ok_or(StakelineError::AmountOverflow)
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<Decimal> for FeeRate {
    type Error = StakelineError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FeeRate> for Decimal {
    fn from(value: FeeRate) -> Self {
        value.0
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", (self.0 * Decimal::ONE_HUNDRED).normalize())
    }
}

fn to_units(value: Decimal) -> Result<u64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(StakelineError::AmountOverflow)
}
