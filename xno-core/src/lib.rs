//! XNO Core — bar series, TP/SL position adjustment, fees and PnL accounting.
//!
//! This crate contains the sequential heart of a position-signal backtest:
//! - Domain types (bars, position sides, validated series)
//! - Position adjuster: one forward scan with fixed or trailing TP/SL exits
//! - Fee model (per-contract transaction and overnight charges)
//! - PnL engine: per-bar PnL, daily aggregation, minimum capital
//!
//! Everything here is synchronous and in-memory. Loading data and computing
//! risk statistics live in `xno-runner`.

pub mod adjust;
pub mod domain;
pub mod pnl;

pub use adjust::{adjust_positions, AdjustError, PositionAdjuster, StopMode, Thresholds};
pub use domain::{Bar, PositionSide, Series, SeriesError};
pub use pnl::{compute_pnl, CapitalConvention, FeeError, FeeModel, PnlEngine, PnlError, PnlMode};
