//! Fixed take-profit / stop-loss — thresholds measured from the entry price.
//!
//! Take-profit arms on the first bar at or beyond `take_profit_pct` and fires
//! on the next such bar. Stop-loss fires on the first bar at or beyond
//! `-stop_loss_pct`, with no arming delay.

use crate::domain::PositionSide;

use super::window::HoldingWindow;
use super::{ExitDecision, ExitPolicy, ExitReason, Thresholds};

/// Exit policy with both thresholds anchored at entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTpSl {
    pub thresholds: Thresholds,
}

impl FixedTpSl {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl ExitPolicy for FixedTpSl {
    fn name(&self) -> &str {
        "fixed_tp_sl"
    }

    fn on_flat(&self, window: &mut HoldingWindow) {
        window.reset();
    }

    fn on_entry(&self, window: &mut HoldingWindow, side: PositionSide, price: f64) {
        window.open(side, price);
    }

    fn on_hold(&self, window: &mut HoldingWindow, price: f64) -> ExitDecision {
        let pnl_pct = window.pnl_pct(price);
        let mut decision = ExitDecision::Hold;

        if pnl_pct >= self.thresholds.take_profit_pct && window.confirm_take_profit() {
            decision = ExitDecision::Exit(ExitReason::TakeProfit);
        }

        // Evaluated after take-profit so a loss on the same bar wins.
        if pnl_pct <= -self.thresholds.stop_loss_pct {
            window.release();
            decision = ExitDecision::Exit(ExitReason::StopLoss);
        }

        decision
    }
}
