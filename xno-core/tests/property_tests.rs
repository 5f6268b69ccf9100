//! Property tests for adjuster and PnL invariants.
//!
//! Uses proptest to verify:
//! 1. Shape — adjustment never changes length, timestamps or closes
//! 2. Domain — every output position is the input position or flat
//! 3. Identity — unreachable thresholds leave the series untouched
//! 4. Fees — transaction and overnight fees are never negative
//! 5. Capital — minimum capital is never negative

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use xno_core::adjust::adjust_positions;
use xno_core::domain::{PositionSide, Series};
use xno_core::pnl::{CapitalConvention, FeeModel, PnlEngine, PnlMode};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_bars() -> impl Strategy<Value = (Vec<f64>, Vec<i64>)> {
    (1usize..80).prop_flat_map(|n| {
        (
            prop::collection::vec(50.0..150.0_f64, n),
            prop::collection::vec(-1i64..=1, n),
        )
    })
}

fn arb_threshold() -> impl Strategy<Value = f64> {
    0.1..20.0_f64
}

fn build(closes: &[f64], positions: &[i64]) -> Series {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    // Two-hour spacing so a run covers several calendar days.
    let ts: Vec<_> = (0..closes.len())
        .map(|i| start + Duration::hours(2 * i as i64))
        .collect();
    Series::from_columns(&ts, closes, positions).unwrap()
}

// ── 1-2. Shape and domain ────────────────────────────────────────────

proptest! {
    #[test]
    fn adjustment_keeps_shape_and_domain(
        (closes, positions) in arb_bars(),
        tp in arb_threshold(),
        sl in arb_threshold(),
        trailing in prop::bool::ANY,
    ) {
        let input = build(&closes, &positions);
        let out = adjust_positions(&input, tp, sl, trailing).unwrap();

        prop_assert_eq!(out.len(), input.len());
        prop_assert_eq!(out.timestamps(), input.timestamps());
        prop_assert_eq!(out.closes(), input.closes());
        for (o, i) in out.positions().iter().zip(input.positions()) {
            prop_assert!(*o == i || o.is_flat());
        }
    }
}

// ── 3. Identity ──────────────────────────────────────────────────────

proptest! {
    /// Closes stay within 50..150, so neither side can move 1000% from entry
    /// and no trailing stop can be crossed.
    #[test]
    fn unreachable_thresholds_are_identity(
        (closes, positions) in arb_bars(),
        trailing in prop::bool::ANY,
    ) {
        let input = build(&closes, &positions);
        let out = adjust_positions(&input, 1000.0, 1000.0, trailing).unwrap();
        prop_assert_eq!(out, input);
    }

    /// A flat-only series is never adjusted, whatever the thresholds.
    #[test]
    fn flat_series_is_identity(
        closes in prop::collection::vec(50.0..150.0_f64, 1..50),
        tp in arb_threshold(),
        sl in arb_threshold(),
        trailing in prop::bool::ANY,
    ) {
        let positions = vec![0; closes.len()];
        let input = build(&closes, &positions);
        let out = adjust_positions(&input, tp, sl, trailing).unwrap();
        prop_assert!(out.positions().iter().all(|p| *p == PositionSide::Flat));
    }
}

// ── 4-5. Fees and capital ────────────────────────────────────────────

proptest! {
    #[test]
    fn fees_and_capital_are_non_negative(
        (closes, positions) in arb_bars(),
        shifted in prop::bool::ANY,
    ) {
        let input = build(&closes, &positions);
        let convention = if shifted { CapitalConvention::Shifted } else { CapitalConvention::Inclusive };
        let engine = PnlEngine::with_options(&input, PnlMode::AfterFees, FeeModel::default(), convention);

        for r in engine.records() {
            prop_assert!(r.transaction_fee >= 0.0);
            prop_assert!(r.overnight_fee >= 0.0);
            prop_assert!((r.total_fee - (r.transaction_fee + r.overnight_fee)).abs() < 1e-12);
        }
        prop_assert!(engine.minimum_capital() >= 0.0);
        prop_assert_eq!(engine.records().last().map(|r| r.raw_pnl), Some(0.0));

        let daily_total: f64 = engine.daily_values().iter().sum();
        prop_assert!((daily_total - engine.total_pnl()).abs() < 1e-6);
    }
}
