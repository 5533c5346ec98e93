//! Backtest runner: wires together configuration, strategy, engine, and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: config plus pre-loaded candles. Used by the CLI and sweeps.
//! - `run_backtest_from_file()`: loads candles from disk first.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use candlesim_core::domain::Candle;
use candlesim_core::engine::{Report, SimulationEngine};

use crate::config::{BacktestConfig, ConfigError, ConfigHash};
use crate::data_loader::{dataset_hash, ensure_ordered, load_candles, LoadError};
use crate::metrics::PerformanceMetrics;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: BacktestConfig,
    pub config_hash: ConfigHash,
    pub dataset_hash: String,
    /// blake3 over the report JSON.
    pub fingerprint: String,
    pub metrics: PerformanceMetrics,
    pub report: Report,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a single backtest on pre-loaded candles without I/O.
pub fn run_backtest(config: &BacktestConfig, candles: &[Candle]) -> Result<BacktestResult, RunError> {
    config.validate()?;
    ensure_ordered(candles)?;

    let strategy = config.build_strategy()?;
    let config_hash = config.config_hash()?;
    info!(
        strategy = %strategy.name(),
        config_hash = %config_hash,
        candles = candles.len(),
        "running backtest"
    );

    let report = SimulationEngine::new(strategy.as_ref(), candles, config.run_config()).run();
    let fingerprint = report.fingerprint()?;
    let metrics = PerformanceMetrics::compute(&report);

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        config_hash,
        dataset_hash: dataset_hash(candles),
        fingerprint,
        metrics,
        report,
    })
}

pub fn run_backtest_from_file(
    config: &BacktestConfig,
    candles_path: impl AsRef<Path>,
) -> Result<BacktestResult, RunError> {
    let candles = load_candles(candles_path)?;
    run_backtest(config, &candles)
}
