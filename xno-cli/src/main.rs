//! XNO CLI — run, sweep and config-check commands.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file or a CSV plus flags
//! - `sweep` — run a TP/SL threshold grid over one CSV in parallel
//! - `check` — parse and validate a TOML config without running it

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use xno_core::pnl::PnlMode;
use xno_runner::export::fmt_metric;
use xno_runner::{
    load_series, run_backtest, save_artifacts, BacktestConfig, BacktestResult, ExitsSection,
    ParamSweep, SweepGrid,
};

#[derive(Parser)]
#[command(
    name = "xno",
    about = "XNO CLI — position-signal backtests with TP/SL overlays and risk metrics"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file or a CSV file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV with date, time, close and position columns.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Take-profit percentage (requires --sl).
        #[arg(long)]
        tp: Option<f64>,

        /// Stop-loss percentage (requires --tp).
        #[arg(long)]
        sl: Option<f64>,

        /// Use a trailing stop instead of a fixed one.
        #[arg(long, default_value_t = false)]
        trailing: bool,

        /// PnL accounting mode: raw or after_fees.
        #[arg(long)]
        mode: Option<String>,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the metrics report as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Sweep take-profit / stop-loss thresholds over one CSV file.
    Sweep {
        /// CSV with date, time, close and position columns.
        #[arg(long)]
        data: PathBuf,

        /// Take-profit percentages, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        tp: Vec<f64>,

        /// Stop-loss percentages, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        sl: Vec<f64>,

        /// Use trailing stops for every grid point.
        #[arg(long, default_value_t = false)]
        trailing: bool,

        /// PnL accounting mode: raw or after_fees.
        #[arg(long)]
        mode: Option<String>,

        /// Number of ranked results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Parse and validate a TOML config file.
    Check {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            data,
            tp,
            sl,
            trailing,
            mode,
            output_dir,
            json,
        } => run_backtest_cmd(config, data, tp, sl, trailing, mode, output_dir, json),
        Commands::Sweep {
            data,
            tp,
            sl,
            trailing,
            mode,
            top,
        } => run_sweep_cmd(data, tp, sl, trailing, mode, top),
        Commands::Check { config } => run_check(config),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[allow(clippy::too_many_arguments)]
fn run_backtest_cmd(
    config_path: Option<PathBuf>,
    data: Option<PathBuf>,
    tp: Option<f64>,
    sl: Option<f64>,
    trailing: bool,
    mode: Option<String>,
    output_dir: PathBuf,
    json: bool,
) -> Result<()> {
    // Validate mutually exclusive options
    let config = match (config_path, data) {
        (Some(_), Some(_)) => bail!("--config and --data are mutually exclusive"),
        (None, None) => bail!("one of --config or --data is required"),
        (Some(path), None) => {
            if tp.is_some() || sl.is_some() || trailing || mode.is_some() {
                bail!("--tp, --sl, --trailing and --mode only apply with --data");
            }
            BacktestConfig::from_file(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        (None, Some(data)) => build_config_from_flags(data, tp, sl, trailing, mode.as_deref())?,
    };

    let result = run_backtest(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.metrics)?);
    } else {
        print_summary(&result);
    }

    let run_dir = save_artifacts(&result, &output_dir)?;
    info!(run_id = %result.run_id, dir = %run_dir.display(), "artifacts saved");
    Ok(())
}

fn build_config_from_flags(
    data: PathBuf,
    tp: Option<f64>,
    sl: Option<f64>,
    trailing: bool,
    mode: Option<&str>,
) -> Result<BacktestConfig> {
    let mut config = BacktestConfig::for_data(data);
    if let Some(mode) = mode {
        config.backtest.pnl_mode = parse_mode(mode)?;
    }
    config.exits = match (tp, sl) {
        (Some(tp), Some(sl)) => Some(ExitsSection {
            take_profit_pct: tp,
            stop_loss_pct: sl,
            trailing,
        }),
        (None, None) if trailing => bail!("--trailing needs --tp and --sl"),
        (None, None) => None,
        _ => bail!("--tp and --sl must be given together"),
    };
    config.validate()?;
    Ok(config)
}

fn parse_mode(mode: &str) -> Result<PnlMode> {
    Ok(mode.parse::<PnlMode>()?)
}

fn run_sweep_cmd(
    data: PathBuf,
    tp: Vec<f64>,
    sl: Vec<f64>,
    trailing: bool,
    mode: Option<String>,
    top: usize,
) -> Result<()> {
    let mut base = BacktestConfig::for_data(data.clone());
    if let Some(mode) = mode.as_deref() {
        base.backtest.pnl_mode = parse_mode(mode)?;
    }
    let series = load_series(&data)
        .with_context(|| format!("failed to load {}", data.display()))?;

    let grid = SweepGrid::new(tp, sl, trailing);
    println!(
        "Sweeping {} grid points over {} bars...",
        grid.size(),
        series.len()
    );
    let results = ParamSweep::new().sweep(&series, &grid, &base)?;

    println!();
    println!(
        "{:>4}  {:>8}  {:>8}  {:>10}  {:>12}  {:>10}  {:>6}",
        "rank", "tp %", "sl %", "sharpe", "total_pnl", "max_dd", "exits"
    );
    for (rank, r) in results.top_n(top).into_iter().enumerate() {
        let (tp, sl) = r
            .config
            .exits
            .map_or((f64::NAN, f64::NAN), |e| (e.take_profit_pct, e.stop_loss_pct));
        println!(
            "{:>4}  {:>8.2}  {:>8.2}  {:>10}  {:>12.4}  {:>10}  {:>6}",
            rank + 1,
            tp,
            sl,
            fmt_metric(r.metrics.sharpe, 3),
            r.total_pnl,
            fmt_metric(r.metrics.max_drawdown, 4),
            r.forced_exit_count()
        );
    }
    Ok(())
}

fn run_check(path: PathBuf) -> Result<()> {
    let config = BacktestConfig::from_file(&path)
        .with_context(|| format!("invalid config {}", path.display()))?;
    println!("Config OK: {}", path.display());
    println!("  data:        {}", config.backtest.data.display());
    println!("  pnl mode:    {}", config.backtest.pnl_mode);
    match config.exits {
        Some(e) => println!(
            "  exits:       tp {}% / sl {}% ({})",
            e.take_profit_pct,
            e.stop_loss_pct,
            if e.trailing { "trailing" } else { "fixed" }
        ),
        None => println!("  exits:       none"),
    }
    println!("  run id:      {}", config.run_id());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Data:           {}", result.config.backtest.data.display());
    println!("PnL Mode:       {}", result.pnl_mode);
    println!(
        "Bars:           {} ({} days)",
        result.bar_count,
        result.day_count()
    );
    println!("Forced Exits:   {}", result.forced_exit_count());
    println!("Total PnL:      {:.4}", result.total_pnl);
    println!("Total Fees:     {:.4}", result.total_fees);
    println!("Min Capital:    {:.4}", result.minimum_capital);
    println!();
    println!("--- Risk Metrics ---");
    for (name, value) in m.entries() {
        println!("{:<16}{}", format!("{name}:"), fmt_metric(value, 4));
    }
    println!();
}
