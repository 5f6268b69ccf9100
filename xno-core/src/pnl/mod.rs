//! PnL accounting — raw and fee-adjusted PnL over a position series.
//!
//! Two accounting modes:
//! - [`PnlMode::Raw`] — price moves times position, fees ignored
//! - [`PnlMode::AfterFees`] — raw PnL minus the [`FeeModel`] charges

pub mod engine;
pub mod fees;

pub use engine::{DailyPnl, PnlEngine, PnlRecord};
pub use fees::{
    FeeBreakdown, FeeError, FeeModel, OVERNIGHT_FEE_PER_CONTRACT, TRANSACTION_FEE_PER_CONTRACT,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Series;

/// Errors from PnL configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PnlError {
    #[error("invalid pnl mode '{0}': choose 'raw' or 'after_fees'")]
    InvalidMode(String),
}

/// Which per-bar PnL column feeds the daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlMode {
    Raw,
    #[default]
    AfterFees,
}

impl PnlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PnlMode::Raw => "raw",
            PnlMode::AfterFees => "after_fees",
        }
    }
}

impl fmt::Display for PnlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PnlMode {
    type Err = PnlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(PnlMode::Raw),
            "after_fees" => Ok(PnlMode::AfterFees),
            other => Err(PnlError::InvalidMode(other.to_string())),
        }
    }
}

/// How realized PnL offsets the capital tied up in a position.
///
/// `capital_required[i] = |position[i]| * close[i] - realized[i]`, where
/// `realized[i]` is the cumulative PnL through bar `i` (`Inclusive`) or
/// through bar `i - 1` (`Shifted`, zero on the first bar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalConvention {
    #[default]
    Inclusive,
    Shifted,
}

/// Snapshot of the PnL computation for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlSummary {
    pub mode: PnlMode,
    pub per_bar_pnl: Vec<PnlRecord>,
    pub daily_pnl: Vec<DailyPnl>,
    pub minimum_capital: f64,
}

impl From<&PnlEngine> for PnlSummary {
    fn from(engine: &PnlEngine) -> Self {
        Self {
            mode: engine.mode(),
            per_bar_pnl: engine.records().to_vec(),
            daily_pnl: engine.daily_pnl().to_vec(),
            minimum_capital: engine.minimum_capital(),
        }
    }
}

/// Compute PnL for a mode literal (`"raw"` or `"after_fees"`) with default fees.
pub fn compute_pnl(series: &Series, mode: &str) -> Result<PnlSummary, PnlError> {
    let mode: PnlMode = mode.parse()?;
    Ok(PnlSummary::from(&PnlEngine::new(series, mode)))
}
