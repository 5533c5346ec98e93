//! Candlesim CLI: run and sweep commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML config on file or synthetic candles
//! - `sweep`: MA-crossover period grid over the same candles, in parallel
//!
//! Reports go to stdout; logs go to stderr, filtered by `CANDLESIM_LOG`
//! (falling back to `--log-level`).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use candlesim_core::domain::Candle;
use candlesim_core::strategy::{StrategyKind, StrategyParams};
use candlesim_runner::{
    generate_synthetic_candles, load_candles, run_backtest, BacktestConfig, BacktestResult,
    ParamGrid, ParamSweep,
};

const LOG_ENV: &str = "CANDLESIM_LOG";
const DEFAULT_SYNTHETIC_START: &str = "2024-01-01T09:15:00+05:30";

#[derive(Parser)]
#[command(name = "candlesim", about = "Candlesim: candle replay backtester with Indian-market fees")]
struct Cli {
    /// Log level when CANDLESIM_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Plain,
    Json,
}

/// Where candles come from.
#[derive(Debug, clap::Args)]
struct CandleSource {
    /// Candle file (.json broker rows/envelope or .csv).
    #[arg(long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    candles: Option<PathBuf>,

    /// Generate this many synthetic 15-minute candles instead.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for synthetic candles.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// First synthetic candle time (RFC 3339).
    #[arg(long, default_value = DEFAULT_SYNTHETIC_START)]
    start: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        source: CandleSource,

        /// Print the full result as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Include the trade log in the summary.
        #[arg(long, default_value_t = false)]
        show_trades: bool,
    },
    /// Sweep MA-crossover periods over one candle series.
    Sweep {
        /// Optional base config; defaults to an MA-crossover config.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        source: CandleSource,

        /// Short periods, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = [3usize, 5, 10])]
        short: Vec<usize>,

        /// Long periods, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = [20usize, 50])]
        long: Vec<usize>,

        /// Run grid points one after another.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Print results as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run {
            config,
            source,
            json,
            show_trades,
        } => run_cmd(config, source, json, show_trades),
        Commands::Sweep {
            config,
            source,
            short,
            long,
            sequential,
            json,
        } => sweep_cmd(config, source, short, long, sequential, json),
    }
}

fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Plain => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

fn load_source(source: &CandleSource) -> Result<Vec<Candle>> {
    match (&source.candles, source.synthetic) {
        (Some(path), _) => load_candles(path)
            .with_context(|| format!("failed to load candles from {}", path.display())),
        (None, Some(n)) => {
            let start: DateTime<FixedOffset> = DateTime::parse_from_rfc3339(&source.start)
                .with_context(|| format!("invalid --start '{}'", source.start))?;
            Ok(generate_synthetic_candles(n, source.seed, start))
        }
        (None, None) => bail!("one of --candles or --synthetic is required"),
    }
}

fn run_cmd(config_path: PathBuf, source: CandleSource, json: bool, show_trades: bool) -> Result<()> {
    let config = BacktestConfig::from_file(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let candles = load_source(&source)?;
    let result = run_backtest(&config, &candles)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result, source.synthetic.is_some());
        if show_trades {
            print_trades(&result);
        }
    }
    Ok(())
}

fn sweep_cmd(
    config_path: Option<PathBuf>,
    source: CandleSource,
    short: Vec<usize>,
    long: Vec<usize>,
    sequential: bool,
    json: bool,
) -> Result<()> {
    let base = match config_path {
        Some(path) => BacktestConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BacktestConfig::new(StrategyKind::MaCrossover, StrategyParams::new()),
    };
    if base.strategy.kind != StrategyKind::MaCrossover {
        bail!(
            "sweep only varies MA-crossover periods; config selects '{}'",
            base.strategy.kind
        );
    }

    let candles = load_source(&source)?;
    let grid = ParamGrid::new(short, long);
    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(&grid, &base, &candles)?;
    if results.is_empty() {
        bail!("no valid (short < long) period pairs in the grid");
    }

    if json {
        let rows: Vec<serde_json::Value> = results
            .sorted_by_net_profit()
            .into_iter()
            .map(|r| {
                serde_json::json!({
                    "shortPeriod": r.config.strategy.params.get_i64("shortPeriod", 0),
                    "longPeriod": r.config.strategy.params.get_i64("longPeriod", 0),
                    "configHash": r.config_hash,
                    "fingerprint": r.fingerprint,
                    "metrics": r.metrics,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!();
    println!("=== Sweep ({} configs, {} candles) ===", results.len(), candles.len());
    println!(
        "{:>6} {:>6} {:>14} {:>9} {:>7} {:>9} {:>10}",
        "short", "long", "net profit", "return%", "trips", "win%", "max dd%"
    );
    for r in results.sorted_by_net_profit() {
        let p = &r.config.strategy.params;
        println!(
            "{:>6} {:>6} {:>14.2} {:>9.3} {:>7} {:>9.1} {:>10.2}",
            p.get_i64("shortPeriod", 0),
            p.get_i64("longPeriod", 0),
            r.metrics.net_profit,
            r.metrics.profit_percentage,
            r.metrics.round_trips,
            r.metrics.win_rate * 100.0,
            r.metrics.max_drawdown * 100.0,
        );
    }
    Ok(())
}

fn print_summary(result: &BacktestResult, synthetic: bool) {
    let report = &result.report;
    let metrics = &result.metrics;
    let diag = &report.diagnostics;

    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", report.strategy);
    if let (Some(first), Some(last)) = (report.source_candles.first(), report.source_candles.last()) {
        println!("Period:         {} to {}", first.timestamp, last.timestamp);
    }
    println!("Candles:        {}", report.source_candles.len());
    println!("Config hash:    {}", result.config_hash);
    println!("Fingerprint:    {}", result.fingerprint);
    println!();
    println!("--- Capital ---");
    println!("Initial:        {:.2}", report.initial_capital);
    println!("Final:          {:.2}", report.final_capital);
    println!("Net Profit:     {:.2}", report.net_profit);
    println!("Return:         {:.3}%", report.profit_percentage);
    println!("Charges:        {:.2}", metrics.total_charges);
    println!();
    println!("--- Trades ---");
    println!("Log Entries:    {}", report.total_trades);
    println!("Round Trips:    {}", metrics.round_trips);
    println!("Win Rate:       {:.1}%", metrics.win_rate * 100.0);
    println!("Avg Trade P&L:  {:.2}", metrics.avg_trade_pnl);
    match metrics.profit_factor {
        Some(pf) => println!("Profit Factor:  {pf:.2}"),
        None => println!("Profit Factor:  n/a"),
    }
    println!("Max Drawdown:   {:.2}%", metrics.max_drawdown * 100.0);
    println!();
    println!("--- Signals ---");
    println!("Received:       {}", diag.signals_received);
    println!("Applied:        {}", diag.signals_applied);
    println!("Rejected:       {}", diag.rejected());
    println!("Unmatched:      {}", diag.unmatched_signals);
    if diag.forced_square_off {
        println!("Open position squared off at end of data");
    }
    if synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_trades(result: &BacktestResult) {
    println!();
    println!(
        "{:<28} {:<14} {:>8} {:>12} {:>14} {:>10}",
        "timestamp", "action", "qty", "price", "value", "charges"
    );
    for t in &result.report.trades {
        println!(
            "{:<28} {:<14} {:>8} {:>12.2} {:>14.2} {:>10.4}",
            t.timestamp.to_rfc3339(),
            t.action,
            t.quantity,
            t.price,
            t.value,
            t.charges
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_synthetic() {
        let cli = Cli::try_parse_from([
            "candlesim", "run", "--config", "run.toml", "--synthetic", "500", "--seed", "7", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { source, json, .. } => {
                assert_eq!(source.synthetic, Some(500));
                assert_eq!(source.seed, 7);
                assert!(source.candles.is_none());
                assert!(json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn candle_sources_are_exclusive_and_required() {
        assert!(Cli::try_parse_from([
            "candlesim", "run", "--config", "c.toml", "--candles", "a.json", "--synthetic", "10",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["candlesim", "run", "--config", "c.toml"]).is_err());
    }

    #[test]
    fn parses_sweep_lists() {
        let cli = Cli::try_parse_from([
            "candlesim", "--log-format", "json", "sweep", "--candles", "c.csv", "--short", "2,4",
            "--long", "8,16,32",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Sweep { short, long, .. } => {
                assert_eq!(short, vec![2, 4]);
                assert_eq!(long, vec![8, 16, 32]);
            }
            _ => panic!("expected sweep"),
        }
    }
}
