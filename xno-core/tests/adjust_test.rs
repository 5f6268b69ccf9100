//! Integration tests for the position adjuster.
//!
//! Tests:
//! 1. Worked scenarios for the fixed and trailing policies.
//! 2. Entry/exit bookkeeping across flips, flat gaps and re-entries.
//! 3. Fixed vs trailing agreement where the trailing stop never moves.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use xno_core::adjust::{
    adjust_positions, ExitReason, FixedTpSl, PositionAdjuster, StopMode, Thresholds, TrailingTpSl,
};
use xno_core::domain::Series;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn make_series(closes: &[f64], positions: &[i64]) -> Series {
    let ts: Vec<_> = (0..closes.len())
        .map(|i| start() + Duration::minutes(5 * i as i64))
        .collect();
    Series::from_columns(&ts, closes, positions).unwrap()
}

fn values(s: &Series) -> Vec<i64> {
    s.positions().iter().map(|p| p.value()).collect()
}

// ──────────────────────────────────────────────
// Worked scenarios
// ──────────────────────────────────────────────

#[test]
fn fixed_take_profit_arms_but_loss_flattens() {
    // Bar 2 (+4%) arms take-profit; no later long bar confirms it.
    // Bar 3 is far below entry, so the stop-loss fires immediately.
    let s = make_series(&[100.0, 102.0, 104.0, 90.0], &[1, 1, 1, 1]);
    let out = adjust_positions(&s, 3.0, 5.0, false).unwrap();
    assert_eq!(values(&out), vec![1, 1, 1, 0]);
}

#[test]
fn trailing_stop_follows_new_high() {
    // Entry 100 → stop 95; high 110 → stop 104.5; 104 ≤ 104.5 → flat.
    let s = make_series(&[100.0, 110.0, 104.0], &[1, 1, 1]);
    let out = adjust_positions(&s, 50.0, 5.0, true).unwrap();
    assert_eq!(values(&out), vec![1, 1, 0]);
}

#[test]
fn fixed_would_not_stop_where_trailing_does() {
    let s = make_series(&[100.0, 110.0, 104.0], &[1, 1, 1]);
    let out = adjust_positions(&s, 50.0, 5.0, false).unwrap();
    assert_eq!(values(&out), vec![1, 1, 1]);
}

#[test]
fn short_take_profit_needs_second_bar() {
    let s = make_series(&[100.0, 96.0, 95.0, 94.0], &[-1, -1, -1, -1]);
    let adj = PositionAdjuster::new(Thresholds::new(3.0, 5.0).unwrap(), StopMode::Fixed).adjust(&s);
    // Bar 1 arms (+4%), bar 2 fires (+5%), bar 3 re-enters short at 94.
    assert_eq!(values(&adj.series), vec![-1, -1, 0, -1]);
    assert_eq!(adj.exits.len(), 1);
    assert_eq!(adj.exits[0].reason, ExitReason::TakeProfit);
    assert_eq!(adj.exits[0].close, 95.0);
}

#[test]
fn flat_gap_resets_entry() {
    // Without the flat bar, 104 would be +4% from 100 and arm; after it, entry is 103.
    let s = make_series(&[100.0, 101.0, 103.0, 104.0, 107.0], &[1, 0, 1, 1, 1]);
    let adj = PositionAdjuster::new(Thresholds::new(3.0, 5.0).unwrap(), StopMode::Fixed).adjust(&s);
    assert_eq!(values(&adj.series), vec![1, 0, 1, 1, 1]);
    assert!(adj.exits.is_empty());
}

#[test]
fn repeated_stop_outs_reenter_each_time() {
    // Steady 6% drops: every held bar stops out, the next bar re-enters.
    let closes = [100.0, 94.0, 88.36, 83.0584, 78.0749];
    let s = make_series(&closes, &[1; 5]);
    let adj = PositionAdjuster::new(Thresholds::new(3.0, 5.0).unwrap(), StopMode::Fixed).adjust(&s);
    assert_eq!(values(&adj.series), vec![1, 0, 1, 0, 1]);
    assert!(adj
        .exits
        .iter()
        .all(|e| e.reason == ExitReason::StopLoss));
}

#[test]
fn exits_report_timestamps_of_input_bars() {
    let s = make_series(&[100.0, 90.0], &[1, 1]);
    let adj = PositionAdjuster::new(Thresholds::new(3.0, 5.0).unwrap(), StopMode::Fixed).adjust(&s);
    assert_eq!(adj.exits[0].timestamp, s.bars()[1].timestamp);
    assert_eq!(adj.series.timestamps(), s.timestamps());
}

#[test]
fn policies_expose_names() {
    use xno_core::adjust::ExitPolicy;
    let t = Thresholds::new(1.0, 1.0).unwrap();
    assert_eq!(FixedTpSl::new(t).name(), "fixed_tp_sl");
    assert_eq!(TrailingTpSl::new(t).name(), "trailing_tp_sl");
}

#[test]
fn trailing_flat_reset_is_not_observable() {
    // Arm take-profit, go flat, come back: the fresh entry disarms in both variants.
    let s = make_series(&[100.0, 104.0, 104.0, 104.0, 105.0], &[1, 1, 0, 1, 1]);
    let fixed = adjust_positions(&s, 3.0, 50.0, false).unwrap();
    let trailing = adjust_positions(&s, 3.0, 50.0, true).unwrap();
    assert_eq!(values(&fixed), vec![1, 1, 0, 1, 1]);
    assert_eq!(values(&fixed), values(&trailing));
}
