//! Candlesim Runner: backtest orchestration on top of `candlesim-core`.
//!
//! This crate provides:
//! - TOML run configuration with a content hash
//! - Candle loading from broker JSON, CSV, or a seeded synthetic series
//! - Single-backtest runner bundling the report, metrics and fingerprints
//! - Parallel MA-crossover parameter sweeps

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, BacktestSection, ConfigError, ConfigHash, StrategySection};
pub use data_loader::{
    dataset_hash, ensure_ordered, generate_synthetic_candles, load_candles, parse_csv_candles,
    parse_json_candles, LoadError,
};
pub use metrics::{PerformanceMetrics, RoundTrip};
pub use runner::{run_backtest, run_backtest_from_file, BacktestResult, RunError, SCHEMA_VERSION};
pub use sweep::{ParamGrid, ParamSweep, SweepResults};
