//! PnL engine — per-bar PnL, fees, daily aggregation and minimum capital.
//!
//! Everything is computed once in [`PnlEngine::new`] and exposed read-only.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Series;

use super::fees::FeeModel;
use super::{CapitalConvention, PnlMode};

/// Per-bar PnL and fee breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnlRecord {
    pub date: NaiveDate,
    /// (next close - close) * position; zero on the last bar.
    pub raw_pnl: f64,
    pub transaction_fee: f64,
    pub overnight_fee: f64,
    pub total_fee: f64,
    pub net_pnl: f64,
}

impl PnlRecord {
    /// The PnL column selected by `mode`.
    pub fn pnl(&self, mode: PnlMode) -> f64 {
        match mode {
            PnlMode::Raw => self.raw_pnl,
            PnlMode::AfterFees => self.net_pnl,
        }
    }
}

/// Summed PnL for one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPnl {
    pub date: NaiveDate,
    pub pnl: f64,
}

/// PnL accounting over one series.
#[derive(Debug, Clone)]
pub struct PnlEngine {
    mode: PnlMode,
    fees: FeeModel,
    convention: CapitalConvention,
    records: Vec<PnlRecord>,
    daily: Vec<DailyPnl>,
    minimum_capital: f64,
}

impl PnlEngine {
    /// Engine with the default fee rates and capital convention.
    pub fn new(series: &Series, mode: PnlMode) -> Self {
        Self::with_options(series, mode, FeeModel::default(), CapitalConvention::default())
    }

    /// `fees` is assumed valid; see [`FeeModel::validate`].
    pub fn with_options(
        series: &Series,
        mode: PnlMode,
        fees: FeeModel,
        convention: CapitalConvention,
    ) -> Self {
        let records = compute_records(series, &fees);
        let daily = group_daily(&records, mode);
        let minimum_capital = estimate_minimum_capital(series, &records, mode, convention);

        debug!(
            bars = records.len(),
            days = daily.len(),
            ?mode,
            ?convention,
            minimum_capital,
            "pnl computed"
        );

        Self {
            mode,
            fees,
            convention,
            records,
            daily,
            minimum_capital,
        }
    }

    pub fn mode(&self) -> PnlMode {
        self.mode
    }

    pub fn fees(&self) -> FeeModel {
        self.fees
    }

    pub fn convention(&self) -> CapitalConvention {
        self.convention
    }

    pub fn records(&self) -> &[PnlRecord] {
        &self.records
    }

    /// Selected per-bar PnL column.
    pub fn bar_pnl(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.pnl(self.mode)).collect()
    }

    /// Running sum of the selected per-bar PnL.
    pub fn cumulative_pnl(&self) -> Vec<f64> {
        running_sum(self.records.iter().map(|r| r.pnl(self.mode)))
    }

    /// Daily PnL in date order.
    pub fn daily_pnl(&self) -> &[DailyPnl] {
        &self.daily
    }

    pub fn daily_values(&self) -> Vec<f64> {
        self.daily.iter().map(|d| d.pnl).collect()
    }

    /// Running sum of daily PnL.
    pub fn cumulative_daily_pnl(&self) -> Vec<DailyPnl> {
        let sums = running_sum(self.daily.iter().map(|d| d.pnl));
        self.daily
            .iter()
            .zip(sums)
            .map(|(d, pnl)| DailyPnl { date: d.date, pnl })
            .collect()
    }

    /// Capital needed to carry every position, never negative.
    pub fn minimum_capital(&self) -> f64 {
        self.minimum_capital
    }

    /// Daily PnL as a fraction of minimum capital; every day is `None` when
    /// minimum capital is zero.
    pub fn pnl_percentage(&self) -> Vec<Option<f64>> {
        if self.minimum_capital == 0.0 {
            return vec![None; self.daily.len()];
        }
        self.daily
            .iter()
            .map(|d| Some(d.pnl / self.minimum_capital))
            .collect()
    }

    pub fn total_fees(&self) -> f64 {
        self.records.iter().map(|r| r.total_fee).sum()
    }

    pub fn total_pnl(&self) -> f64 {
        self.records.iter().map(|r| r.pnl(self.mode)).sum()
    }
}

fn compute_records(series: &Series, fees: &FeeModel) -> Vec<PnlRecord> {
    let bars = series.bars();
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let raw_pnl = bars
                .get(i + 1)
                .map_or(0.0, |next| (next.close - bar.close) * bar.position.as_f64());
            let previous = i.checked_sub(1).map(|p| &bars[p]);
            // The first bar has no previous date, so it counts as a new day.
            let new_day = previous.map_or(true, |p| p.date() != bar.date());
            let fee = fees.charge(previous.map(|p| p.position), bar.position, new_day);

            PnlRecord {
                date: bar.date(),
                raw_pnl,
                transaction_fee: fee.transaction,
                overnight_fee: fee.overnight,
                total_fee: fee.total(),
                net_pnl: raw_pnl - fee.total(),
            }
        })
        .collect()
}

fn group_daily(records: &[PnlRecord], mode: PnlMode) -> Vec<DailyPnl> {
    let mut daily: Vec<DailyPnl> = Vec::new();
    for record in records {
        match daily.last_mut() {
            Some(day) if day.date == record.date => day.pnl += record.pnl(mode),
            _ => daily.push(DailyPnl {
                date: record.date,
                pnl: record.pnl(mode),
            }),
        }
    }
    daily
}

fn estimate_minimum_capital(
    series: &Series,
    records: &[PnlRecord],
    mode: PnlMode,
    convention: CapitalConvention,
) -> f64 {
    let cumulative = running_sum(records.iter().map(|r| r.pnl(mode)));

    series
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let realized = match convention {
                CapitalConvention::Inclusive => cumulative[i],
                CapitalConvention::Shifted => i.checked_sub(1).map_or(0.0, |p| cumulative[p]),
            };
            bar.position.value().abs() as f64 * bar.close - realized
        })
        .fold(0.0_f64, f64::max)
}

fn running_sum(values: impl Iterator<Item = f64>) -> Vec<f64> {
    values
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}
