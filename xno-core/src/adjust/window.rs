//! Holding window — the state carried across bars while a position is held.

use crate::domain::PositionSide;

/// Scan state for the position currently being held.
///
/// Only meaningful while `entry_side` is not flat; `entry_price` keeps the
/// last entry after the window is released.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HoldingWindow {
    pub entry_price: f64,
    pub entry_side: PositionSide,
    /// Set on the first bar the take-profit threshold is reached.
    pub profit_armed: bool,
    /// Best close since entry (highest for longs, lowest for shorts). Trailing only.
    pub trailing_extreme: Option<f64>,
    /// Current trailing stop price. Trailing only.
    pub trailing_stop_level: Option<f64>,
}

impl HoldingWindow {
    /// Start a new window at `price`.
    pub fn open(&mut self, side: PositionSide, price: f64) {
        self.entry_price = price;
        self.entry_side = side;
        self.profit_armed = false;
    }

    /// Forget the entry side but keep the take-profit arming flag.
    pub fn release(&mut self) {
        self.entry_side = PositionSide::Flat;
    }

    /// Forget the entry side and disarm take-profit.
    pub fn reset(&mut self) {
        self.entry_side = PositionSide::Flat;
        self.profit_armed = false;
    }

    pub fn is_open(&self) -> bool {
        !self.entry_side.is_flat()
    }

    /// Signed PnL percentage of `price` relative to the entry, positive when in favor.
    pub fn pnl_pct(&self, price: f64) -> f64 {
        match self.entry_side {
            PositionSide::Long => (price - self.entry_price) / self.entry_price * 100.0,
            PositionSide::Short => (self.entry_price - price) / self.entry_price * 100.0,
            PositionSide::Flat => 0.0,
        }
    }

    /// One take-profit step: the first touch arms, the next touch confirms.
    ///
    /// Returns `true` when the exit is confirmed; the window is reset in that case.
    pub fn confirm_take_profit(&mut self) -> bool {
        if !self.profit_armed {
            self.profit_armed = true;
            false
        } else {
            self.reset();
            true
        }
    }
}
