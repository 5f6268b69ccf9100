//! Fee model — per-contract transaction and overnight charges.
//!
//! Transaction fee: |position change| * transaction rate. The first bar has no
//! prior position and pays nothing.
//! Overnight fee: a flat charge on a long bar that opens a new calendar day.
//! Short and flat bars never pay it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PositionSide;

/// Default transaction fee per contract moved (2,700 / 100,000).
pub const TRANSACTION_FEE_PER_CONTRACT: f64 = 2700.0 / 100_000.0;

/// Default overnight fee per contract held into a new day (2,550 / 100,000).
pub const OVERNIGHT_FEE_PER_CONTRACT: f64 = 2550.0 / 100_000.0;

/// Fees charged on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub transaction: f64,
    pub overnight: f64,
}

impl FeeBreakdown {
    pub fn total(&self) -> f64 {
        self.transaction + self.overnight
    }
}

/// A fee rate that cannot be charged.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("fee '{name}' must be finite and non-negative, got {value}")]
pub struct FeeError {
    pub name: &'static str,
    pub value: f64,
}

/// Per-contract fee rates.
///
/// Both rates must be finite and non-negative. [`FeeModel::try_new`] and
/// [`FeeModel::validate`] check this; `new` and the public fields do not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeModel {
    pub transaction: f64,
    pub overnight: f64,
}

impl Default for FeeModel {
    fn default() -> Self {
        Self {
            transaction: TRANSACTION_FEE_PER_CONTRACT,
            overnight: OVERNIGHT_FEE_PER_CONTRACT,
        }
    }
}

impl FeeModel {
    pub fn new(transaction: f64, overnight: f64) -> Self {
        Self {
            transaction,
            overnight,
        }
    }

    /// Validated constructor.
    pub fn try_new(transaction: f64, overnight: f64) -> Result<Self, FeeError> {
        let fees = Self::new(transaction, overnight);
        fees.validate()?;
        Ok(fees)
    }

    pub fn validate(&self) -> Result<(), FeeError> {
        for (name, value) in [("transaction", self.transaction), ("overnight", self.overnight)] {
            if !value.is_finite() || value < 0.0 {
                return Err(FeeError { name, value });
            }
        }
        Ok(())
    }

    /// No fees at all.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Fee for moving from `previous` to `current`; zero when there is no previous bar.
    pub fn transaction_fee(&self, previous: Option<PositionSide>, current: PositionSide) -> f64 {
        match previous {
            Some(prev) => (current.value() - prev.value()).abs() as f64 * self.transaction,
            None => 0.0,
        }
    }

    /// Overnight charge for a bar; only long exposure on a new day pays.
    pub fn overnight_fee(&self, current: PositionSide, new_day: bool) -> f64 {
        if current.is_long() && new_day {
            self.overnight
        } else {
            0.0
        }
    }

    /// Both fees for one bar.
    pub fn charge(
        &self,
        previous: Option<PositionSide>,
        current: PositionSide,
        new_day: bool,
    ) -> FeeBreakdown {
        FeeBreakdown {
            transaction: self.transaction_fee(previous, current),
            overnight: self.overnight_fee(current, new_day),
        }
    }
}
