//! Trailing stop with take-profit.
//!
//! Take-profit is the same arm-then-fire rule as [`FixedTpSl`](super::FixedTpSl).
//! The stop starts `stop_loss_pct` away from entry and ratchets with the best
//! close since entry:
//!
//! For longs: stop = highest_close_since_entry * (1 - stop_loss_pct / 100).
//! For shorts: stop = lowest_close_since_entry * (1 + stop_loss_pct / 100).
//!
//! A flat bar releases the window without disarming take-profit; the next
//! entry disarms it anyway.

use crate::domain::PositionSide;

use super::window::HoldingWindow;
use super::{ExitDecision, ExitPolicy, ExitReason, Thresholds};

/// Exit policy with a ratcheting stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingTpSl {
    pub thresholds: Thresholds,
}

impl TrailingTpSl {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    fn stop_from(&self, side: PositionSide, extreme: f64) -> f64 {
        let distance = self.thresholds.stop_loss_pct / 100.0;
        match side {
            PositionSide::Short => extreme * (1.0 + distance),
            _ => extreme * (1.0 - distance),
        }
    }
}

impl ExitPolicy for TrailingTpSl {
    fn name(&self) -> &str {
        "trailing_tp_sl"
    }

    fn on_flat(&self, window: &mut HoldingWindow) {
        window.release();
    }

    fn on_entry(&self, window: &mut HoldingWindow, side: PositionSide, price: f64) {
        window.open(side, price);
        window.trailing_extreme = Some(price);
        window.trailing_stop_level = Some(self.stop_from(side, price));
    }

    fn on_hold(&self, window: &mut HoldingWindow, price: f64) -> ExitDecision {
        let side = window.entry_side;
        let pnl_pct = window.pnl_pct(price);
        let mut decision = ExitDecision::Hold;

        if pnl_pct >= self.thresholds.take_profit_pct && window.confirm_take_profit() {
            decision = ExitDecision::Exit(ExitReason::TakeProfit);
        }

        let (Some(extreme), Some(stop)) = (window.trailing_extreme, window.trailing_stop_level)
        else {
            return decision;
        };

        let (stopped, improved) = match side {
            PositionSide::Short => (price >= stop, price < extreme),
            _ => (price <= stop, price > extreme),
        };

        if stopped {
            window.release();
            decision = ExitDecision::Exit(ExitReason::TrailingStop);
        } else if improved {
            window.trailing_extreme = Some(price);
            window.trailing_stop_level = Some(self.stop_from(side, price));
        }

        decision
    }
}
