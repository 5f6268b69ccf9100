//! Serializable backtest configuration, parsed from TOML.
//!
//! ```toml
//! [backtest]
//! data = "bars.csv"
//! pnl_mode = "after_fees"
//! capital_convention = "inclusive"
//!
//! [exits]
//! take_profit_pct = 3.0
//! stop_loss_pct = 5.0
//! trailing = false
//!
//! [fees]
//! transaction = 0.027
//! overnight = 0.0255
//!
//! [metrics]
//! risk_free_rate = 0.0
//! confidence_level = 0.05
//! initial_capital = 1.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use xno_core::adjust::{AdjustError, PositionAdjuster, StopMode, Thresholds};
use xno_core::pnl::{CapitalConvention, FeeModel, PnlMode};

use crate::metrics::MetricsOptions;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from reading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Threshold(#[from] AdjustError),
    #[error("fee '{name}' must be finite and non-negative, got {value}")]
    InvalidFee { name: &'static str, value: f64 },
    #[error("confidence_level must lie in (0, 1), got {0}")]
    InvalidConfidence(f64),
    #[error("initial_capital must be finite and positive, got {0}")]
    InvalidCapital(f64),
    #[error("risk_free_rate must be finite, got {0}")]
    InvalidRiskFreeRate(f64),
}

/// Full configuration for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exits: Option<ExitsSection>,
    #[serde(default)]
    pub fees: FeeModel,
    #[serde(default)]
    pub metrics: MetricsOptions,
}

/// `[backtest]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    /// CSV file with date, time, close and position columns.
    pub data: PathBuf,
    #[serde(default)]
    pub pnl_mode: PnlMode,
    #[serde(default)]
    pub capital_convention: CapitalConvention,
}

/// `[exits]` table: the TP/SL overlay applied before PnL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitsSection {
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    #[serde(default)]
    pub trailing: bool,
}

impl ExitsSection {
    pub fn stop_mode(&self) -> StopMode {
        if self.trailing {
            StopMode::Trailing
        } else {
            StopMode::Fixed
        }
    }

    pub fn thresholds(&self) -> Result<Thresholds, AdjustError> {
        Thresholds::new(self.take_profit_pct, self.stop_loss_pct)
    }

    pub fn adjuster(&self) -> Result<PositionAdjuster, AdjustError> {
        Ok(PositionAdjuster::new(self.thresholds()?, self.stop_mode()))
    }
}

impl BacktestConfig {
    /// Config for a data file with every other setting at its default.
    pub fn for_data(data: impl Into<PathBuf>) -> Self {
        Self {
            backtest: BacktestSection {
                data: data.into(),
                pnl_mode: PnlMode::default(),
                capital_convention: CapitalConvention::default(),
            },
            exits: None,
            fees: FeeModel::default(),
            metrics: MetricsOptions::default(),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file. A relative `backtest.data` path is
    /// resolved against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if config.backtest.data.is_relative() {
            if let Some(dir) = path.parent() {
                config.backtest.data = dir.join(&config.backtest.data);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(exits) = &self.exits {
            exits.thresholds()?;
        }
        self.fees
            .validate()
            .map_err(|e| ConfigError::InvalidFee { name: e.name, value: e.value })?;
        let m = &self.metrics;
        if !(m.confidence_level > 0.0 && m.confidence_level < 1.0) {
            return Err(ConfigError::InvalidConfidence(m.confidence_level));
        }
        if !m.initial_capital.is_finite() || m.initial_capital <= 0.0 {
            return Err(ConfigError::InvalidCapital(m.initial_capital));
        }
        if !m.risk_free_rate.is_finite() {
            return Err(ConfigError::InvalidRiskFreeRate(m.risk_free_rate));
        }
        Ok(())
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two runs with identical configs share a RunId, so result directories
    /// are stable across reruns.
    pub fn run_id(&self) -> RunId {
        // Plain structs of numbers, strings and enums always serialize.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[backtest]
data = "bars.csv"
pnl_mode = "raw"
capital_convention = "shifted"

[exits]
take_profit_pct = 3.0
stop_loss_pct = 5.0
trailing = true

[fees]
transaction = 0.1
overnight = 0.2

[metrics]
risk_free_rate = 0.01
confidence_level = 0.1
initial_capital = 1000.0
"#;

    #[test]
    fn parses_full_config() {
        let c = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(c.backtest.data, PathBuf::from("bars.csv"));
        assert_eq!(c.backtest.pnl_mode, PnlMode::Raw);
        assert_eq!(c.backtest.capital_convention, CapitalConvention::Shifted);
        let exits = c.exits.unwrap();
        assert_eq!(exits.stop_mode(), StopMode::Trailing);
        assert_eq!(c.fees, FeeModel::new(0.1, 0.2));
        assert_eq!(c.metrics.initial_capital, 1000.0);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let c = BacktestConfig::from_toml("[backtest]\ndata = \"x.csv\"\n").unwrap();
        assert_eq!(c, BacktestConfig::for_data("x.csv"));
        assert_eq!(c.backtest.pnl_mode, PnlMode::AfterFees);
        assert!(c.exits.is_none());
        assert_eq!(c.metrics, MetricsOptions::default());
    }

    #[test]
    fn rejects_unknown_pnl_mode() {
        let err = BacktestConfig::from_toml("[backtest]\ndata = \"x\"\npnl_mode = \"net\"\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_bad_thresholds() {
        let toml = "[backtest]\ndata = \"x\"\n[exits]\ntake_profit_pct = 0.0\nstop_loss_pct = 5.0\n";
        assert!(matches!(
            BacktestConfig::from_toml(toml),
            Err(ConfigError::Threshold(_))
        ));
    }

    #[test]
    fn rejects_negative_fee() {
        let mut c = BacktestConfig::for_data("x");
        c.fees.overnight = -1.0;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidFee { name: "overnight", .. })
        ));
    }

    #[test]
    fn rejects_confidence_out_of_range() {
        let mut c = BacktestConfig::for_data("x");
        c.metrics.confidence_level = 1.0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidConfidence(_))));
    }

    #[test]
    fn rejects_zero_capital() {
        let mut c = BacktestConfig::for_data("x");
        c.metrics.initial_capital = 0.0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidCapital(_))));
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let a = BacktestConfig::from_toml(FULL).unwrap();
        let b = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 64);

        let mut c = a.clone();
        c.exits = Some(ExitsSection {
            take_profit_pct: 4.0,
            stop_loss_pct: 5.0,
            trailing: true,
        });
        assert_ne!(a.run_id(), c.run_id());
    }

    #[test]
    fn toml_roundtrip() {
        let c = BacktestConfig::from_toml(FULL).unwrap();
        let text = toml::to_string(&c).unwrap();
        assert_eq!(BacktestConfig::from_toml(&text).unwrap(), c);
    }
}
