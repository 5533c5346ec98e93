//! Moving-average crossover: long-only golden/death cross on close SMAs.
//!
//! BUY when the short SMA crosses above the long SMA while flat; SELL on the
//! opposite cross while long. The previous pair compares non-strictly and the
//! current pair strictly, so a tie on the previous candle still counts as
//! "not yet crossed".

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use super::{IndicatorSeries, OrderSettings, Strategy, StrategyParams};
use crate::domain::{Action, Candle};
use crate::indicators::{simple_average, Indicator, Sma};

pub const DEFAULT_SHORT_PERIOD: usize = 10;
pub const DEFAULT_LONG_PERIOD: usize = 50;
/// Extra closes kept beyond the longest period.
const WINDOW_BUFFER: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct MaCrossover;

/// Resolved `shortPeriod`/`longPeriod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossoverPeriods {
    pub short: usize,
    pub long: usize,
}

impl CrossoverPeriods {
    /// Periods below 1 fall back to the defaults.
    pub fn from_params(params: &StrategyParams) -> Self {
        Self {
            short: period_or_default(params, "shortPeriod", DEFAULT_SHORT_PERIOD),
            long: period_or_default(params, "longPeriod", DEFAULT_LONG_PERIOD),
        }
    }

    fn slowest(&self) -> usize {
        self.short.max(self.long)
    }
}

fn period_or_default(params: &StrategyParams, key: &str, default: usize) -> usize {
    let raw = params.get_i64(key, default as i64);
    if raw < 1 {
        warn!(key, value = raw, default, "period must be >= 1, using default");
        default
    } else {
        raw as usize
    }
}

/// Per-run state: a bounded trailing window of closes and the proposer's own
/// view of whether it has an open position.
struct CrossoverState {
    periods: CrossoverPeriods,
    closes: VecDeque<f64>,
    capacity: usize,
    position_open: bool,
}

impl CrossoverState {
    fn new(periods: CrossoverPeriods) -> Self {
        let capacity = periods.slowest() + WINDOW_BUFFER;
        Self {
            periods,
            closes: VecDeque::with_capacity(capacity + 1),
            capacity,
            position_open: false,
        }
    }

    fn push(&mut self, close: f64) {
        self.closes.push_back(close);
        while self.closes.len() > self.capacity {
            self.closes.pop_front();
        }
    }

    /// Mean of `period` closes ending `offset` closes before the newest.
    fn mean(&self, period: usize, offset: usize) -> f64 {
        let end = self.closes.len() - offset;
        let window: Vec<f64> = self.closes.range(end - period..end).copied().collect();
        simple_average(&window)
    }

    fn evaluate(&mut self, candle: &Candle, orders: &OrderSettings) -> Action {
        if self.closes.len() < self.periods.slowest() + 1 {
            return Action::hold(candle.timestamp);
        }

        let CrossoverPeriods { short, long } = self.periods;
        let short_ma = self.mean(short, 0);
        let long_ma = self.mean(long, 0);
        let prev_short = self.mean(short, 1);
        let prev_long = self.mean(long, 1);

        if prev_short <= prev_long && short_ma > long_ma && !self.position_open {
            self.position_open = true;
            debug!(
                timestamp = %candle.timestamp,
                price = candle.close,
                prev_short, prev_long, short_ma, long_ma,
                "short SMA crossed above long SMA"
            );
            Action::buy(
                candle.timestamp,
                candle.close,
                orders.quantity,
                orders.order_details(),
            )
            .with_reason("GOLDEN_CROSS")
        } else if prev_short >= prev_long && short_ma < long_ma && self.position_open {
            self.position_open = false;
            debug!(
                timestamp = %candle.timestamp,
                price = candle.close,
                prev_short, prev_long, short_ma, long_ma,
                "short SMA crossed below long SMA"
            );
            Action::sell(
                candle.timestamp,
                candle.close,
                orders.quantity,
                orders.order_details(),
            )
            .with_reason("DEATH_CROSS")
        } else {
            Action::hold(candle.timestamp)
        }
    }
}

impl MaCrossover {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> String {
        "MA Crossover".to_string()
    }

    fn generate_signals(&self, candles: &[Candle], params: &StrategyParams) -> Vec<Action> {
        let periods = CrossoverPeriods::from_params(params);
        let orders = OrderSettings::from_params(params);
        info!(
            strategy = %self.name(),
            short = periods.short,
            long = periods.long,
            product_type = %orders.product_type,
            symbol = %orders.trading_symbol,
            candles = candles.len(),
            "generating signals"
        );

        let mut state = CrossoverState::new(periods);
        let signals: Vec<Action> = candles
            .iter()
            .filter_map(|candle| {
                state.push(candle.close);
                let action = state.evaluate(candle, &orders);
                (!action.is_hold()).then_some(action)
            })
            .collect();

        info!(strategy = %self.name(), signals = signals.len(), "signals generated");
        signals
    }

    fn indicator_data(&self, candles: &[Candle], params: &StrategyParams) -> IndicatorSeries {
        let periods = CrossoverPeriods::from_params(params);
        [Sma::new(periods.short), Sma::new(periods.long)]
            .iter()
            .map(|sma| (sma.name().to_string(), sma.compute(candles)))
            .collect()
    }
}
