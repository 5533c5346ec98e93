//! Strategies: signal proposers replayed by the simulation engine.
//!
//! A strategy sees the whole candle history up front and returns its BUY/SELL
//! decisions in one batch. It never sees the engine's ledger: the engine alone
//! decides which proposals become fills.

pub mod ma_crossover;
pub mod params;
pub mod rsi_deviation;
pub mod session;

pub use ma_crossover::MaCrossover;
pub use params::{OrderSettings, StrategyParams};
pub use rsi_deviation::{RsiDeviation, RsiDeviationConfig, RsiGates};
pub use session::TradingSession;

use crate::domain::{Action, Candle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Named indicator series aligned 1:1 with the candles, NaN where undefined.
pub type IndicatorSeries = BTreeMap<String, Vec<f64>>;

/// Signal generator contract.
///
/// `generate_signals` returns only BUY/SELL actions, in non-decreasing
/// timestamp order, each stamped with some input candle's timestamp. Per-run
/// state is built fresh inside every call, so one value can serve many runs.
pub trait Strategy: Send + Sync {
    fn name(&self) -> String;

    fn generate_signals(&self, candles: &[Candle], params: &StrategyParams) -> Vec<Action>;

    /// Series for charting. Not consumed by the engine.
    fn indicator_data(&self, candles: &[Candle], params: &StrategyParams) -> IndicatorSeries;
}

/// Built-in strategies addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MaCrossover,
    RsiDeviation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("unknown strategy '{0}' (expected ma_crossover or rsi_deviation)")]
    UnknownStrategy(String),

    #[error("unknown variant '{variant}' for strategy {kind}")]
    UnknownVariant { kind: StrategyKind, variant: String },
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::MaCrossover, StrategyKind::RsiDeviation];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::MaCrossover => "ma_crossover",
            StrategyKind::RsiDeviation => "rsi_deviation",
        }
    }

    /// Instantiate the strategy. `variant` selects a preset where one exists.
    pub fn build(self, variant: Option<&str>) -> Result<Box<dyn Strategy>, StrategyError> {
        match (self, variant) {
            (StrategyKind::MaCrossover, None) => Ok(Box::new(MaCrossover::new())),
            (StrategyKind::RsiDeviation, None | Some("default")) => {
                Ok(Box::new(RsiDeviation::new(RsiDeviationConfig::default())))
            }
            (StrategyKind::RsiDeviation, Some("price_deviation")) => Ok(Box::new(
                RsiDeviation::new(RsiDeviationConfig::price_deviation()),
            )),
            (kind, Some(variant)) => Err(StrategyError::UnknownVariant {
                kind,
                variant: variant.to_string(),
            }),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ma_crossover" | "ma_cross" => Ok(StrategyKind::MaCrossover),
            "rsi_deviation" | "rsi" => Ok(StrategyKind::RsiDeviation),
            _ => Err(StrategyError::UnknownStrategy(s.to_string())),
        }
    }
}
