//! XNO Runner — configuration, data loading, risk metrics and orchestration.
//!
//! This crate builds on `xno-core` to provide:
//! - TOML backtest configuration with validation and content-hashed run ids
//! - CSV loading into a validated series
//! - Risk metrics over daily PnL (Sharpe, Sortino, Calmar, drawdown, VaR, ...)
//! - Single-backtest runner (adjust → PnL → metrics)
//! - JSON / CSV / Markdown export
//! - Parallel TP/SL parameter sweeps

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError, ExitsSection, RunId};
pub use data_loader::{load_series, load_series_from_reader, LoadError};
pub use export::{
    export_daily_csv, export_exits_csv, export_json, generate_report, import_json,
    load_artifacts, save_artifacts,
};
pub use metrics::{compute_metrics, compute_metrics_with, MetricsOptions, MetricsReport, RiskMetrics};
pub use runner::{run_backtest, run_on_series, BacktestResult, RunError, SCHEMA_VERSION};
pub use sweep::{ParamSweep, SweepGrid, SweepResults};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn metrics_report_is_send_sync() {
        assert_send::<MetricsReport>();
        assert_sync::<MetricsReport>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<SweepGrid>();
        assert_sync::<SweepGrid>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
