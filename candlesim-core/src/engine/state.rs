//! Run configuration.

use crate::strategy::StrategyParams;
use serde::{Deserialize, Serialize};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_SHARES_PER_TRADE: u64 = 10;

/// Inputs of a single backtest run besides the strategy and candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub initial_capital: f64,
    /// Entry size booked by the ledger, regardless of the signal's own quantity.
    pub shares_per_trade: u64,
    pub strategy_params: StrategyParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            shares_per_trade: DEFAULT_SHARES_PER_TRADE,
            strategy_params: StrategyParams::default(),
        }
    }
}

impl RunConfig {
    pub fn new(initial_capital: f64, shares_per_trade: u64, strategy_params: StrategyParams) -> Self {
        Self {
            initial_capital,
            shares_per_trade,
            strategy_params,
        }
    }

    pub fn with_params(strategy_params: StrategyParams) -> Self {
        Self {
            strategy_params,
            ..Self::default()
        }
    }
}
