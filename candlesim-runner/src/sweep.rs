//! Parameter sweep over MA-crossover periods, one engine per grid point.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::info;

use candlesim_core::domain::Candle;

use crate::config::BacktestConfig;
use crate::runner::{run_backtest, BacktestResult, RunError};

/// Grid of `shortPeriod` × `longPeriod` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    pub short_periods: Vec<usize>,
    pub long_periods: Vec<usize>,
}

impl ParamGrid {
    pub fn new(short_periods: Vec<usize>, long_periods: Vec<usize>) -> Self {
        Self {
            short_periods,
            long_periods,
        }
    }

    /// Short periods 3, 5, 10 × long periods 20, 50.
    pub fn ma_crossover_default() -> Self {
        Self::new(vec![3, 5, 10], vec![20, 50])
    }

    /// Upper bound on the number of configurations (before filtering).
    pub fn size(&self) -> usize {
        self.short_periods.len() * self.long_periods.len()
    }

    /// One config per valid pair; pairs with `short >= long` are skipped.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::new();
        for &short in &self.short_periods {
            for &long in &self.long_periods {
                if short >= long {
                    continue;
                }
                let mut config = base.clone();
                config.strategy.params.set("shortPeriod", short as u64);
                config.strategy.params.set("longPeriod", long as u64);
                configs.push(config);
            }
        }
        configs
    }
}

/// Parameter sweep executor.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every grid configuration against the same candles.
    ///
    /// Results come back in grid order regardless of parallelism.
    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &BacktestConfig,
        candles: &[Candle],
    ) -> Result<SweepResults, RunError> {
        let configs = grid.generate_configs(base);
        info!(
            configs = configs.len(),
            parallel = self.parallel,
            candles = candles.len(),
            "starting parameter sweep"
        );

        let results: Vec<BacktestResult> = if self.parallel {
            configs
                .par_iter()
                .map(|config| run_backtest(config, candles))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .map(|config| run_backtest(config, candles))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults::new(results))
    }
}

/// Results from a parameter sweep.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_config_hash: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_config_hash = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.config_hash.clone(), i))
            .collect();
        Self {
            results,
            by_config_hash,
        }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, config_hash: &str) -> Option<&BacktestResult> {
        self.by_config_hash
            .get(config_hash)
            .map(|&i| &self.results[i])
    }

    /// Results sorted by net profit, best first.
    pub fn sorted_by_net_profit(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| {
            b.report
                .net_profit
                .partial_cmp(&a.report.net_profit)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.sorted_by_net_profit().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::generate_synthetic_candles;
    use candlesim_core::strategy::{StrategyKind, StrategyParams};
    use chrono::DateTime;

    fn candles() -> Vec<Candle> {
        let start = DateTime::parse_from_rfc3339("2024-03-15T09:15:00+05:30").unwrap();
        generate_synthetic_candles(400, 11, start)
    }

    fn base() -> BacktestConfig {
        BacktestConfig::new(StrategyKind::MaCrossover, StrategyParams::new())
    }

    #[test]
    fn grid_filters_invalid_combinations() {
        let grid = ParamGrid::new(vec![10, 50, 100], vec![50, 100]);
        assert_eq!(grid.size(), 6);

        let configs = grid.generate_configs(&base());
        // (10,50), (10,100), (50,100)
        assert_eq!(configs.len(), 3);
        for config in &configs {
            let p = &config.strategy.params;
            assert!(p.get_i64("shortPeriod", 0) < p.get_i64("longPeriod", 0));
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let candles = candles();
        let grid = ParamGrid::ma_crossover_default();
        let seq = ParamSweep::new()
            .with_parallelism(false)
            .sweep(&grid, &base(), &candles)
            .unwrap();
        let par = ParamSweep::new().sweep(&grid, &base(), &candles).unwrap();

        assert_eq!(seq.len(), 6);
        let seq_prints: Vec<_> = seq.all().iter().map(|r| &r.fingerprint).collect();
        let par_prints: Vec<_> = par.all().iter().map(|r| &r.fingerprint).collect();
        assert_eq!(seq_prints, par_prints);
    }

    #[test]
    fn sorted_and_indexed() {
        let results = ParamSweep::new()
            .sweep(&ParamGrid::ma_crossover_default(), &base(), &candles())
            .unwrap();
        let sorted = results.sorted_by_net_profit();
        for pair in sorted.windows(2) {
            assert!(pair[0].report.net_profit >= pair[1].report.net_profit);
        }
        let best = results.best().unwrap();
        assert_eq!(
            results.get(&best.config_hash).map(|r| &r.fingerprint),
            Some(&best.fingerprint)
        );
    }
}
