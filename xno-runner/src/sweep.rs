//! Parameter sweep over take-profit / stop-loss grids.
//!
//! One series is loaded once and every grid point runs against it, in
//! parallel by default.

use std::cmp::Ordering;
use std::collections::HashMap;

use rayon::prelude::*;
use tracing::info;

use xno_core::domain::Series;

use crate::config::{BacktestConfig, ExitsSection};
use crate::runner::{run_on_series, BacktestResult, RunError};

/// Threshold grid to sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    pub take_profit_pcts: Vec<f64>,
    pub stop_loss_pcts: Vec<f64>,
    pub trailing: bool,
}

impl SweepGrid {
    pub fn new(take_profit_pcts: Vec<f64>, stop_loss_pcts: Vec<f64>, trailing: bool) -> Self {
        Self {
            take_profit_pcts,
            stop_loss_pcts,
            trailing,
        }
    }

    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.take_profit_pcts.len() * self.stop_loss_pcts.len()
    }

    /// Generates one config per (tp, sl) pair, everything else from `base`.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::with_capacity(self.size());
        for &tp in &self.take_profit_pcts {
            for &sl in &self.stop_loss_pcts {
                let mut config = base.clone();
                config.exits = Some(ExitsSection {
                    take_profit_pct: tp,
                    stop_loss_pct: sl,
                    trailing: self.trailing,
                });
                configs.push(config);
            }
        }
        configs
    }
}

/// Parameter sweep executor.
#[derive(Debug, Clone, Copy)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every grid point against `series`. The first invalid grid point
    /// aborts the sweep.
    pub fn sweep(
        &self,
        series: &Series,
        grid: &SweepGrid,
        base: &BacktestConfig,
    ) -> Result<SweepResults, RunError> {
        let configs = grid.generate_configs(base);

        let results: Vec<BacktestResult> = if self.parallel {
            configs
                .par_iter()
                .map(|config| run_on_series(series, config))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .map(|config| run_on_series(series, config))
                .collect::<Result<Vec<_>, _>>()?
        };

        info!(
            points = results.len(),
            parallel = self.parallel,
            "sweep complete"
        );
        Ok(SweepResults::new(results))
    }
}

/// Results from a parameter sweep.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    /// Returns all results in grid order.
    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Gets a result by RunId.
    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Results by Sharpe, best first; undefined Sharpe sorts last.
    pub fn sorted_by_sharpe(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| compare_sharpe(a.metrics.sharpe, b.metrics.sharpe));
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().next()
    }
}

fn compare_sharpe(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
