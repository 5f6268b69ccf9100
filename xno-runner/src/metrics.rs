//! Risk metrics — pure statistics over a daily PnL series.
//!
//! Every statistic that divides by a possibly-empty population or a zero
//! denominator returns `Option<f64>`; `None` means "not applicable to this
//! sample" and is never replaced by 0.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Trading days per year used to annualize ratios.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Default quantile for value at risk.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.05;

/// Parameters for the ratio and percentage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsOptions {
    pub risk_free_rate: f64,
    pub confidence_level: f64,
    /// Scale for the `*_pct` statistics.
    pub initial_capital: f64,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            initial_capital: 1.0,
        }
    }
}

/// Calculator over one daily PnL series and its minimum capital.
#[derive(Debug, Clone, Copy)]
pub struct RiskMetrics<'a> {
    daily: &'a [f64],
    minimum_capital: f64,
}

impl<'a> RiskMetrics<'a> {
    pub fn new(daily: &'a [f64], minimum_capital: f64) -> Self {
        Self {
            daily,
            minimum_capital,
        }
    }

    pub fn sample_size(&self) -> usize {
        self.daily.len()
    }

    /// Mean of the losing days (a negative number).
    pub fn avg_loss(&self) -> Option<f64> {
        mean(self.daily.iter().copied().filter(|d| *d < 0.0))
    }

    pub fn avg_win(&self) -> Option<f64> {
        mean(self.daily.iter().copied().filter(|d| *d > 0.0))
    }

    pub fn avg_return(&self) -> Option<f64> {
        mean(self.daily.iter().copied())
    }

    pub fn avg_loss_pct(&self, initial_capital: f64) -> Option<f64> {
        scale(self.avg_loss(), initial_capital)
    }

    pub fn avg_win_pct(&self, initial_capital: f64) -> Option<f64> {
        scale(self.avg_win(), initial_capital)
    }

    pub fn avg_return_pct(&self, initial_capital: f64) -> Option<f64> {
        scale(self.avg_return(), initial_capital)
    }

    /// Sample standard deviation (n - 1); undefined below two days.
    pub fn volatility(&self) -> Option<f64> {
        sample_std(self.daily)
    }

    /// Fraction of days with positive PnL; 0 for an empty series.
    pub fn win_rate(&self) -> f64 {
        if self.daily.is_empty() {
            return 0.0;
        }
        let wins = self.daily.iter().filter(|d| **d > 0.0).count();
        wins as f64 / self.daily.len() as f64
    }

    /// Deepest fall of cumulative daily PnL below its running peak, as a
    /// fraction of minimum capital. Never positive.
    pub fn max_drawdown(&self) -> Option<f64> {
        if self.minimum_capital == 0.0 || self.daily.is_empty() {
            return None;
        }
        let mut cumulative = 0.0;
        let mut peak = f64::NEG_INFINITY;
        let mut deepest = 0.0_f64;
        for d in self.daily {
            cumulative += d;
            peak = peak.max(cumulative);
            deepest = deepest.min(cumulative - peak);
        }
        finite(deepest / self.minimum_capital)
    }

    pub fn sharpe(&self, risk_free_rate: f64) -> Option<f64> {
        let vol = self.volatility().filter(|v| *v > 0.0)?;
        let avg = self.avg_return()?;
        finite((avg - risk_free_rate) / vol * TRADING_DAYS_PER_YEAR.sqrt())
    }

    /// Like Sharpe, with the sample std of the losing days as the denominator.
    pub fn sortino(&self, risk_free_rate: f64) -> Option<f64> {
        let losses: Vec<f64> = self.daily.iter().copied().filter(|d| *d < 0.0).collect();
        let downside = sample_std(&losses).filter(|s| *s > 0.0)?;
        let avg = self.avg_return()?;
        finite((avg - risk_free_rate) / downside * TRADING_DAYS_PER_YEAR.sqrt())
    }

    pub fn calmar(&self, risk_free_rate: f64) -> Option<f64> {
        let dd = self.max_drawdown().filter(|dd| *dd != 0.0)?;
        let avg = self.avg_return()?;
        finite((avg - risk_free_rate) / dd.abs() * TRADING_DAYS_PER_YEAR.sqrt())
    }

    /// Gross gains over gross losses.
    pub fn profit_factor(&self) -> Option<f64> {
        let gains: f64 = self.daily.iter().filter(|d| **d > 0.0).sum();
        let losses: f64 = self.daily.iter().filter(|d| **d < 0.0).sum::<f64>().abs();
        if losses == 0.0 {
            return None;
        }
        finite(gains / losses)
    }

    /// `((1 - win_rate) / win_rate) ^ (1 / avg_loss)`.
    pub fn risk_of_ruin(&self) -> Option<f64> {
        ruin(self.win_rate(), self.avg_loss())
    }

    /// Risk of ruin with the loss average scaled by `initial_capital`.
    pub fn risk_of_ruin_pct(&self, initial_capital: f64) -> Option<f64> {
        ruin(self.win_rate(), self.avg_loss_pct(initial_capital))
    }

    /// Empirical quantile of daily PnL, linearly interpolated between order
    /// statistics.
    pub fn value_at_risk(&self, confidence_level: f64) -> Option<f64> {
        if self.daily.is_empty() || !(0.0..=1.0).contains(&confidence_level) {
            return None;
        }
        let mut sorted = self.daily.to_vec();
        sorted.sort_by(f64::total_cmp);

        let pos = confidence_level * (sorted.len() - 1) as f64;
        let lower = pos.floor() as usize;
        let upper = pos.ceil() as usize;
        let frac = pos - lower as f64;
        finite(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
    }

    pub fn report(&self, options: &MetricsOptions) -> MetricsReport {
        MetricsReport {
            sample_size: self.sample_size(),
            minimum_capital: self.minimum_capital,
            avg_return: self.avg_return(),
            avg_win: self.avg_win(),
            avg_loss: self.avg_loss(),
            avg_return_pct: self.avg_return_pct(options.initial_capital),
            avg_win_pct: self.avg_win_pct(options.initial_capital),
            avg_loss_pct: self.avg_loss_pct(options.initial_capital),
            volatility: self.volatility(),
            win_rate: self.win_rate(),
            max_drawdown: self.max_drawdown(),
            sharpe: self.sharpe(options.risk_free_rate),
            sortino: self.sortino(options.risk_free_rate),
            calmar: self.calmar(options.risk_free_rate),
            profit_factor: self.profit_factor(),
            risk_of_ruin: self.risk_of_ruin(),
            risk_of_ruin_pct: self.risk_of_ruin_pct(options.initial_capital),
            value_at_risk: self.value_at_risk(options.confidence_level),
        }
    }
}

/// Every statistic for one daily PnL series. `None` fields are undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub sample_size: usize,
    pub minimum_capital: f64,
    pub avg_return: Option<f64>,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub avg_return_pct: Option<f64>,
    pub avg_win_pct: Option<f64>,
    pub avg_loss_pct: Option<f64>,
    pub volatility: Option<f64>,
    pub win_rate: f64,
    pub max_drawdown: Option<f64>,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
    pub calmar: Option<f64>,
    pub profit_factor: Option<f64>,
    pub risk_of_ruin: Option<f64>,
    pub risk_of_ruin_pct: Option<f64>,
    pub value_at_risk: Option<f64>,
}

impl MetricsReport {
    /// Named statistics in display order.
    pub fn entries(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("avg_return", self.avg_return),
            ("avg_win", self.avg_win),
            ("avg_loss", self.avg_loss),
            ("avg_return_pct", self.avg_return_pct),
            ("avg_win_pct", self.avg_win_pct),
            ("avg_loss_pct", self.avg_loss_pct),
            ("volatility", self.volatility),
            ("win_rate", Some(self.win_rate)),
            ("max_drawdown", self.max_drawdown),
            ("sharpe", self.sharpe),
            ("sortino", self.sortino),
            ("calmar", self.calmar),
            ("profit_factor", self.profit_factor),
            ("risk_of_ruin", self.risk_of_ruin),
            ("risk_of_ruin_pct", self.risk_of_ruin_pct),
            ("value_at_risk", self.value_at_risk),
        ]
    }

    /// Names of the statistics that are undefined for this sample.
    pub fn undefined(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter_map(|(name, value)| value.is_none().then_some(name))
            .collect()
    }
}

/// Compute the full report for a daily PnL series.
pub fn compute_metrics(
    daily_pnl: &[f64],
    minimum_capital: f64,
    risk_free_rate: f64,
    confidence_level: f64,
) -> MetricsReport {
    let options = MetricsOptions {
        risk_free_rate,
        confidence_level,
        ..MetricsOptions::default()
    };
    compute_metrics_with(daily_pnl, minimum_capital, &options)
}

pub fn compute_metrics_with(
    daily_pnl: &[f64],
    minimum_capital: f64,
    options: &MetricsOptions,
) -> MetricsReport {
    let report = RiskMetrics::new(daily_pnl, minimum_capital).report(options);
    let undefined = report.undefined();
    if !undefined.is_empty() {
        warn!(
            days = report.sample_size,
            minimum_capital,
            undefined = %undefined.join(","),
            "metrics report has undefined statistics"
        );
    }
    report
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values.iter().copied())?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn scale(value: Option<f64>, initial_capital: f64) -> Option<f64> {
    if initial_capital == 0.0 || !initial_capital.is_finite() {
        return None;
    }
    value.map(|v| v / initial_capital)
}

fn ruin(win_rate: f64, avg_loss: Option<f64>) -> Option<f64> {
    let avg_loss = avg_loss.filter(|l| *l != 0.0)?;
    if win_rate == 0.0 {
        return None;
    }
    finite(((1.0 - win_rate) / win_rate).powf(1.0 / avg_loss))
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
