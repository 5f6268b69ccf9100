//! Bar — the fundamental observation: a close price and the position held over it.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::position::PositionSide;

/// One timestamped observation of a strategy.
///
/// `position` is the exposure held from this bar's close to the next bar's
/// close, so the PnL attributed to bar `i` is realized at bar `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub position: PositionSide,
}

impl Bar {
    pub fn new(timestamp: NaiveDateTime, close: f64, position: PositionSide) -> Self {
        Self {
            timestamp,
            close,
            position,
        }
    }

    /// Calendar date of the bar, used for day-boundary detection and daily grouping.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Same bar with a different position.
    pub fn with_position(self, position: PositionSide) -> Self {
        Self { position, ..self }
    }

    /// Close must be a positive, finite number.
    pub fn is_sane(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        Bar::new(ts, 1250.5, PositionSide::Long)
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_rejects_non_positive_or_nan_close() {
        let mut bar = sample_bar();
        bar.close = 0.0;
        assert!(!bar.is_sane());
        bar.close = f64::NAN;
        assert!(!bar.is_sane());
        bar.close = -3.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn date_drops_time_of_day() {
        assert_eq!(
            sample_bar().date(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn with_position_keeps_price_and_time() {
        let bar = sample_bar();
        let flat = bar.with_position(PositionSide::Flat);
        assert_eq!(flat.timestamp, bar.timestamp);
        assert_eq!(flat.close, bar.close);
        assert!(flat.position.is_flat());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
