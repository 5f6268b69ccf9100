//! Backtest runner — wires together loading, the position adjuster, PnL and
//! metrics.
//!
//! Two entry points:
//! - `run_backtest()`: loads the configured CSV, then runs. Used by the CLI.
//! - `run_on_series()`: takes a pre-loaded series. Used by the sweep and tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use xno_core::adjust::{AdjustError, ForcedExit};
use xno_core::domain::Series;
use xno_core::pnl::{CapitalConvention, DailyPnl, PnlEngine, PnlMode};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_series, LoadError};
use crate::metrics::{compute_metrics_with, MetricsReport};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("adjuster error: {0}")]
    Adjust(#[from] AdjustError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: BacktestConfig,
    pub pnl_mode: PnlMode,
    pub capital_convention: CapitalConvention,
    pub bar_count: usize,
    pub forced_exits: Vec<ForcedExit>,
    pub minimum_capital: f64,
    pub total_pnl: f64,
    pub total_fees: f64,
    pub daily_pnl: Vec<DailyPnl>,
    /// Daily PnL over minimum capital; `None` when capital is zero.
    pub pnl_percentage: Vec<Option<f64>>,
    pub metrics: MetricsReport,
}

impl BacktestResult {
    pub fn forced_exit_count(&self) -> usize {
        self.forced_exits.len()
    }

    pub fn day_count(&self) -> usize {
        self.daily_pnl.len()
    }
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a backtest from a config, loading `backtest.data` from disk.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let series = load_series(&config.backtest.data)?;
    run_on_series(&series, config)
}

/// Run a backtest on an already-loaded series. No I/O.
pub fn run_on_series(series: &Series, config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;

    let (adjusted, forced_exits) = match &config.exits {
        Some(exits) => {
            let adjustment = exits.adjuster()?.adjust(series);
            (adjustment.series, adjustment.exits)
        }
        None => (series.clone(), Vec::new()),
    };

    let engine = PnlEngine::with_options(
        &adjusted,
        config.backtest.pnl_mode,
        config.fees,
        config.backtest.capital_convention,
    );
    if engine.minimum_capital() == 0.0 && !adjusted.is_empty() {
        warn!("minimum capital is zero; percentage statistics are undefined");
    }

    let daily = engine.daily_values();
    let metrics = compute_metrics_with(&daily, engine.minimum_capital(), &config.metrics);

    let result = BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        config: config.clone(),
        pnl_mode: engine.mode(),
        capital_convention: engine.convention(),
        bar_count: adjusted.len(),
        forced_exits,
        minimum_capital: engine.minimum_capital(),
        total_pnl: engine.total_pnl(),
        total_fees: engine.total_fees(),
        daily_pnl: engine.daily_pnl().to_vec(),
        pnl_percentage: engine.pnl_percentage(),
        metrics,
    };

    info!(
        run_id = %&result.run_id[..12],
        bars = result.bar_count,
        days = result.day_count(),
        forced_exits = result.forced_exit_count(),
        total_pnl = result.total_pnl,
        minimum_capital = result.minimum_capital,
        "backtest complete"
    );
    Ok(result)
}
