//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: daily PnL and the forced-exit log for external analysis tools
//! - **Markdown**: human-readable single-run report
//!
//! Undefined statistics are `null` in JSON, empty in CSV and `n/a` in
//! Markdown.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export daily PnL as CSV.
///
/// Columns: date, pnl, cumulative_pnl, pnl_pct
pub fn export_daily_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "pnl", "cumulative_pnl", "pnl_pct"])?;

    let mut cumulative = 0.0;
    for (i, day) in result.daily_pnl.iter().enumerate() {
        cumulative += day.pnl;
        let pct = result.pnl_percentage.get(i).copied().flatten();
        wtr.write_record([
            day.date.to_string(),
            format!("{:.6}", day.pnl),
            format!("{:.6}", cumulative),
            pct.map(|p| format!("{p:.8}")).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the forced-exit log as CSV.
///
/// Columns: bar_index, timestamp, close, side, reason
pub fn export_exits_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "close", "side", "reason"])?;
    for exit in &result.forced_exits {
        wtr.write_record([
            exit.bar_index.to_string(),
            exit.timestamp.to_string(),
            format!("{:.6}", exit.close),
            i64::from(exit.side).to_string(),
            exit.reason.as_str().to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named after the first 16 characters of the run id
/// under `output_dir` containing:
/// - `manifest.json` — the full `BacktestResult`
/// - `daily.csv` — daily PnL
/// - `exits.csv` — forced exits
/// - `report.md` — Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname: String = result.run_id.chars().take(16).collect();
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("daily.csv"), export_daily_csv(result)?)?;
    std::fs::write(run_dir.join("exits.csv"), export_exits_csv(result)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// `n/a` for undefined statistics.
pub fn fmt_metric(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".to_string(),
    }
}

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    md.push_str("# Backtest Report\n\n");

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!(
        "| Data | {} |\n",
        result.config.backtest.data.display()
    ));
    md.push_str(&format!("| PnL Mode | {} |\n", result.pnl_mode));
    md.push_str(&format!(
        "| Capital Convention | {:?} |\n",
        result.capital_convention
    ));
    md.push_str(&format!(
        "| Bars | {} ({} days) |\n",
        result.bar_count,
        result.day_count()
    ));
    match &result.config.exits {
        Some(exits) => md.push_str(&format!(
            "| Exits | TP {}% / SL {}% ({}) |\n",
            exits.take_profit_pct,
            exits.stop_loss_pct,
            if exits.trailing { "trailing" } else { "fixed" }
        )),
        None => md.push_str("| Exits | none |\n"),
    }
    md.push_str(&format!(
        "| Forced Exits | {} |\n",
        result.forced_exit_count()
    ));
    md.push('\n');

    // PnL
    md.push_str("## PnL\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Total PnL | {:.4} |\n", result.total_pnl));
    md.push_str(&format!("| Total Fees | {:.4} |\n", result.total_fees));
    md.push_str(&format!(
        "| Minimum Capital | {:.4} |\n",
        result.minimum_capital
    ));
    md.push('\n');

    // Risk metrics
    let m = &result.metrics;
    md.push_str("## Risk Metrics\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    for (name, value) in m.entries() {
        md.push_str(&format!("| {name} | {} |\n", fmt_metric(value, 4)));
    }
    md.push('\n');

    let undefined = m.undefined();
    if !undefined.is_empty() {
        md.push_str("## Undefined Statistics\n\n");
        for name in undefined {
            md.push_str(&format!("- {name}\n"));
        }
        md.push('\n');
    }

    md
}
