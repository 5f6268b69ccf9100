//! Position adjustment — overlays take-profit / stop-loss exits on a position series.
//!
//! The adjuster makes one left-to-right pass over a [`Series`], threading a
//! single [`HoldingWindow`] through every bar. Each bar is classified as:
//!
//! - **flat**: the policy's `on_flat` runs and the bar passes through;
//! - **entry** (position differs from the window's side, including a flip):
//!   the window is reopened at this close and the bar passes through;
//! - **hold**: the policy decides whether to force the bar flat.
//!
//! A forced exit only rewrites the output bar to flat. The input keeps its
//! position, so the next non-flat bar is treated as a fresh entry.
//!
//! ## Concrete policies
//!
//! - [`FixedTpSl`] — thresholds measured from the entry price
//! - [`TrailingTpSl`] — stop ratchets with the best close since entry

pub mod fixed;
pub mod trailing;
pub mod window;

pub use fixed::FixedTpSl;
pub use trailing::TrailingTpSl;
pub use window::HoldingWindow;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{PositionSide, Series};

/// Errors from building an adjuster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdjustError {
    #[error("{name} must be a positive, finite percentage, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Take-profit and stop-loss distances, in percent (e.g. 3.0 for 3%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
}

impl Thresholds {
    pub fn new(take_profit_pct: f64, stop_loss_pct: f64) -> Result<Self, AdjustError> {
        check_pct("take_profit_pct", take_profit_pct)?;
        check_pct("stop_loss_pct", stop_loss_pct)?;
        Ok(Self {
            take_profit_pct,
            stop_loss_pct,
        })
    }
}

fn check_pct(name: &'static str, value: f64) -> Result<(), AdjustError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AdjustError::InvalidThreshold { name, value })
    }
}

/// Which stop-loss rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    #[default]
    Fixed,
    Trailing,
}

/// Why a bar was forced flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TrailingStop,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TrailingStop => "trailing_stop",
        }
    }
}

/// Outcome of evaluating a held bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    Hold,
    Exit(ExitReason),
}

/// A bar the adjuster forced flat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForcedExit {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub side: PositionSide,
    pub reason: ExitReason,
}

/// Trait for exit policies driven by the adjuster's scan.
///
/// The adjuster owns the loop and the bar classification; policies only
/// mutate the window and decide exits on held bars.
pub trait ExitPolicy: Send + Sync {
    /// Human-readable name (e.g., "fixed_tp_sl").
    fn name(&self) -> &str;

    /// Called on a bar whose input position is flat.
    fn on_flat(&self, window: &mut HoldingWindow);

    /// Called when a position opens or flips at `price`.
    fn on_entry(&self, window: &mut HoldingWindow, side: PositionSide, price: f64);

    /// Called on a bar that keeps the window's side.
    fn on_hold(&self, window: &mut HoldingWindow, price: f64) -> ExitDecision;
}

/// Result of an adjustment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub series: Series,
    pub exits: Vec<ForcedExit>,
}

/// Run an exit policy over a series, producing a new series.
pub fn scan(series: &Series, policy: &dyn ExitPolicy) -> Adjustment {
    let mut window = HoldingWindow::default();
    let mut positions = Vec::with_capacity(series.len());
    let mut exits = Vec::new();

    for (bar_index, bar) in series.iter().enumerate() {
        let side = bar.position;

        if side.is_flat() {
            policy.on_flat(&mut window);
            positions.push(side);
            continue;
        }

        if side != window.entry_side {
            policy.on_entry(&mut window, side, bar.close);
            positions.push(side);
            continue;
        }

        match policy.on_hold(&mut window, bar.close) {
            ExitDecision::Hold => positions.push(side),
            ExitDecision::Exit(reason) => {
                debug!(
                    policy = policy.name(),
                    bar_index,
                    close = bar.close,
                    ?reason,
                    "forced exit"
                );
                exits.push(ForcedExit {
                    bar_index,
                    timestamp: bar.timestamp,
                    close: bar.close,
                    side,
                    reason,
                });
                positions.push(PositionSide::Flat);
            }
        }
    }

    let bars = series
        .iter()
        .zip(&positions)
        .map(|(bar, &side)| bar.with_position(side))
        .collect();

    Adjustment {
        series: Series::from_trusted(bars),
        exits,
    }
}

/// Rewrites position series with TP/SL exits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionAdjuster {
    thresholds: Thresholds,
    mode: StopMode,
}

impl PositionAdjuster {
    pub fn new(thresholds: Thresholds, mode: StopMode) -> Self {
        Self { thresholds, mode }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn mode(&self) -> StopMode {
        self.mode
    }

    /// Adjust a series and report every forced exit.
    pub fn adjust(&self, series: &Series) -> Adjustment {
        match self.mode {
            StopMode::Fixed => scan(series, &FixedTpSl::new(self.thresholds)),
            StopMode::Trailing => scan(series, &TrailingTpSl::new(self.thresholds)),
        }
    }
}

/// Adjust positions with take-profit / stop-loss exits.
///
/// Positions and ordering are guaranteed by [`Series`]; only the thresholds
/// can fail validation here.
pub fn adjust_positions(
    series: &Series,
    take_profit_pct: f64,
    stop_loss_pct: f64,
    trailing: bool,
) -> Result<Series, AdjustError> {
    let thresholds = Thresholds::new(take_profit_pct, stop_loss_pct)?;
    let mode = if trailing {
        StopMode::Trailing
    } else {
        StopMode::Fixed
    };
    Ok(PositionAdjuster::new(thresholds, mode).adjust(series).series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(closes: &[f64], positions: &[i64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let ts: Vec<_> = (0..closes.len())
            .map(|i| start + chrono::Duration::minutes(i as i64))
            .collect();
        Series::from_columns(&ts, closes, positions).unwrap()
    }

    fn values(s: &Series) -> Vec<i64> {
        s.positions().iter().map(|p| p.value()).collect()
    }

    #[test]
    fn rejects_non_positive_thresholds() {
        let s = series(&[100.0], &[1]);
        assert!(matches!(
            adjust_positions(&s, 0.0, 5.0, false),
            Err(AdjustError::InvalidThreshold {
                name: "take_profit_pct",
                ..
            })
        ));
        assert!(adjust_positions(&s, 3.0, f64::NAN, false).is_err());
        assert!(adjust_positions(&s, 3.0, -1.0, true).is_err());
    }

    #[test]
    fn empty_series_stays_empty() {
        let s = Series::default();
        let out = adjust_positions(&s, 3.0, 5.0, false).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn fixed_loss_flattens_bar() {
        let s = series(&[100.0, 102.0, 104.0, 90.0], &[1, 1, 1, 1]);
        let out = adjust_positions(&s, 3.0, 5.0, false).unwrap();
        assert_eq!(values(&out), vec![1, 1, 1, 0]);
    }

    #[test]
    fn take_profit_exit_then_reentry() {
        // Bar 2 arms, bar 3 fires, bar 4 is a fresh entry at 106.
        let s = series(&[100.0, 101.0, 104.0, 105.0, 106.0, 107.0], &[1; 6]);
        let adj = PositionAdjuster::new(Thresholds::new(3.0, 5.0).unwrap(), StopMode::Fixed)
            .adjust(&s);
        assert_eq!(values(&adj.series), vec![1, 1, 1, 0, 1, 1]);
        assert_eq!(adj.exits.len(), 1);
        assert_eq!(adj.exits[0].bar_index, 3);
        assert_eq!(adj.exits[0].reason, ExitReason::TakeProfit);
    }

    #[test]
    fn flip_reopens_window() {
        // Long from 100, flip short at 96 (would be a -4% long), short gains after.
        let s = series(&[100.0, 96.0, 95.0, 94.0], &[1, -1, -1, -1]);
        let out = adjust_positions(&s, 3.0, 5.0, false).unwrap();
        assert_eq!(values(&out), vec![1, -1, -1, -1]);
    }

    #[test]
    fn trailing_stop_flattens_bar() {
        let s = series(&[100.0, 110.0, 104.0], &[1, 1, 1]);
        let adj = PositionAdjuster::new(Thresholds::new(50.0, 5.0).unwrap(), StopMode::Trailing)
            .adjust(&s);
        assert_eq!(values(&adj.series), vec![1, 1, 0]);
        assert_eq!(adj.exits[0].reason, ExitReason::TrailingStop);
        assert_eq!(adj.exits[0].side, PositionSide::Long);
    }

    #[test]
    fn input_is_not_mutated() {
        let s = series(&[100.0, 90.0], &[1, 1]);
        let before = s.clone();
        let _ = adjust_positions(&s, 3.0, 5.0, false).unwrap();
        assert_eq!(s, before);
    }

    #[test]
    fn stop_mode_serde() {
        assert_eq!(serde_json::to_string(&StopMode::Trailing).unwrap(), "\"trailing\"");
        let m: StopMode = serde_json::from_str("\"fixed\"").unwrap();
        assert_eq!(m, StopMode::Fixed);
    }
}
