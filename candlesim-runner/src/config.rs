//! Serializable backtest configuration, read from TOML.
//!
//! ```toml
//! [backtest]
//! initial_capital = 100000.0
//! shares_per_trade = 10
//!
//! [strategy]
//! type = "ma_crossover"
//! [strategy.params]
//! shortPeriod = 3
//! longPeriod = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use candlesim_core::engine::{RunConfig, DEFAULT_INITIAL_CAPITAL, DEFAULT_SHARES_PER_TRADE};
use candlesim_core::strategy::{Strategy, StrategyError, StrategyKind, StrategyParams};

/// Content-addressable identifier of a configuration.
pub type ConfigHash = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("config serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single backtest run: capital, sizing and strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_shares_per_trade")]
    pub shares_per_trade: u64,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            shares_per_trade: DEFAULT_SHARES_PER_TRADE,
        }
    }
}

fn default_initial_capital() -> f64 {
    DEFAULT_INITIAL_CAPITAL
}

fn default_shares_per_trade() -> u64 {
    DEFAULT_SHARES_PER_TRADE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    #[serde(rename = "type")]
    pub kind: StrategyKind,
    /// Preset name, e.g. `"price_deviation"` for the RSI family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default)]
    pub params: StrategyParams,
}

impl BacktestConfig {
    pub fn new(kind: StrategyKind, params: StrategyParams) -> Self {
        Self {
            backtest: BacktestSection::default(),
            strategy: StrategySection {
                kind,
                variant: None,
                params,
            },
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capital = self.backtest.initial_capital;
        if !capital.is_finite() || capital < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_capital must be a finite non-negative number, got {capital}"
            )));
        }
        Ok(())
    }

    /// Engine-level run configuration.
    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(
            self.backtest.initial_capital,
            self.backtest.shares_per_trade,
            self.strategy.params.clone(),
        )
    }

    pub fn build_strategy(&self) -> Result<Box<dyn Strategy>, ConfigError> {
        Ok(self.strategy.kind.build(self.strategy.variant.as_deref())?)
    }

    /// blake3 hex over the canonical JSON form; equal configs hash equal.
    pub fn config_hash(&self) -> Result<ConfigHash, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
