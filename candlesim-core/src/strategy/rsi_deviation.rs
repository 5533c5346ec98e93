//! RSI deviation: long-only mean-reversion/momentum entries on Wilder RSI.
//!
//! Every evaluated candle passes through the session and volume gates first.
//! Entries (flat only, subject to trade spacing):
//! - `OVERSOLD_RECOVERY`: RSI climbs out of the oversold zone on a rising trend.
//! - `PRICE_STABLE_DIVERGENCE`: price flat over a 3-candle window while RSI jumps.
//! - `VOLUME_MOMENTUM`: mid-band RSI rising on above-average volume.
//!
//! Exits (long only), labelled in priority order: `OVERBOUGHT`,
//! `DIVERGENCE_NEGATIVE`, `PROFIT_TARGET`, `TIME_EXIT`, `STOP_LOSS`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{IndicatorSeries, OrderSettings, Strategy, StrategyParams, TradingSession};
use crate::domain::{Action, Candle};
use crate::indicators::rsi::wilder_rsi;
use crate::indicators::{simple_average, trailing_mean};

/// Fixed thresholds shared by every preset of the family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiGates {
    /// Skip candles whose volume is below this fraction of the trailing average.
    pub volume_floor: f64,
    /// Volume multiple required by the momentum entry.
    pub volume_surge: f64,
    pub volume_window: usize,
    pub stability_lookback: usize,
    pub stability_max_deviation: f64,
    pub trend_periods: usize,
    pub max_holding_candles: usize,
    /// Trailing candles never evaluated.
    pub trailing_guard: usize,
    /// Candles required beyond `rsi_period` before any evaluation.
    pub min_history_extra: usize,
    /// RSI values required beyond the stabilization count.
    pub min_rsi_values_extra: usize,
    /// Offset added to `rsi_period + stabilization` for the first evaluated candle.
    pub evaluation_offset: usize,
    /// How far past a threshold the previous RSI must sit for a reversal.
    pub reversal_margin: f64,
    pub divergence_band: (f64, f64),
    pub momentum_band: (f64, f64),
    pub momentum_max_change_pct: f64,
    pub negative_divergence_floor: f64,
    pub session: TradingSession,
}

impl Default for RsiGates {
    fn default() -> Self {
        Self {
            volume_floor: 0.5,
            volume_surge: 1.2,
            volume_window: 20,
            stability_lookback: 3,
            stability_max_deviation: 2.0,
            trend_periods: 3,
            max_holding_candles: 50,
            trailing_guard: 5,
            min_history_extra: 20,
            min_rsi_values_extra: 10,
            evaluation_offset: 5,
            reversal_margin: 2.0,
            divergence_band: (35.0, 65.0),
            momentum_band: (40.0, 60.0),
            momentum_max_change_pct: 0.2,
            negative_divergence_floor: 45.0,
            session: TradingSession::default(),
        }
    }
}

/// Overridable thresholds. Parameter keys are the camelCase names in
/// [`RsiDeviationConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiDeviationConfig {
    pub name: String,
    pub rsi_period: usize,
    pub oversold_threshold: f64,
    pub overbought_threshold: f64,
    pub rsi_confirmation_buffer: f64,
    pub price_stability_threshold_percent: f64,
    pub min_rsi_positive_difference: f64,
    pub min_candles_between_trades: usize,
    pub min_profit_target: f64,
    pub stop_loss_percent: f64,
    pub avoid_market_open_close: bool,
    pub market_open_avoid_minutes: i64,
    pub market_close_avoid_minutes: i64,
    pub rsi_signal_stabilization: usize,
    pub gates: RsiGates,
}

impl Default for RsiDeviationConfig {
    fn default() -> Self {
        Self {
            name: "RSI Deviation".to_string(),
            rsi_period: 14,
            oversold_threshold: 25.0,
            overbought_threshold: 75.0,
            rsi_confirmation_buffer: 2.0,
            price_stability_threshold_percent: 0.15,
            min_rsi_positive_difference: 2.0,
            min_candles_between_trades: 10,
            min_profit_target: 0.2,
            stop_loss_percent: 0.4,
            avoid_market_open_close: true,
            market_open_avoid_minutes: 15,
            market_close_avoid_minutes: 15,
            rsi_signal_stabilization: 15,
            gates: RsiGates::default(),
        }
    }
}

impl RsiDeviationConfig {
    /// Price-deviation preset. Same thresholds, its own display name.
    pub fn price_deviation() -> Self {
        Self {
            name: "RSI Price Deviation".to_string(),
            ..Self::default()
        }
    }

    /// Apply overrides from `params` on top of this preset.
    pub fn resolve(&self, params: &StrategyParams) -> Self {
        let stabilization_key = if params.contains("rsiSignalStabilization") {
            "rsiSignalStabilization"
        } else {
            "rsiSignalStabilizationCount"
        };
        Self {
            name: self.name.clone(),
            rsi_period: positive(params, "rsiPeriod", self.rsi_period),
            oversold_threshold: params.get_f64("oversoldThreshold", self.oversold_threshold),
            overbought_threshold: params.get_f64("overboughtThreshold", self.overbought_threshold),
            rsi_confirmation_buffer: params
                .get_f64("rsiConfirmationBuffer", self.rsi_confirmation_buffer),
            price_stability_threshold_percent: params.get_f64(
                "priceStabilityThresholdPercent",
                self.price_stability_threshold_percent,
            ),
            min_rsi_positive_difference: params
                .get_f64("minRsiPositiveDifference", self.min_rsi_positive_difference),
            min_candles_between_trades: non_negative(
                params,
                "minCandlesBetweenTrades",
                self.min_candles_between_trades,
            ),
            min_profit_target: params.get_f64("minProfitTarget", self.min_profit_target),
            stop_loss_percent: params.get_f64("stopLossPercent", self.stop_loss_percent),
            avoid_market_open_close: params
                .get_bool("avoidMarketOpenClose", self.avoid_market_open_close),
            market_open_avoid_minutes: avoid_minutes(
                params,
                "marketOpenAvoidMinutes",
                self.market_open_avoid_minutes,
            ),
            market_close_avoid_minutes: avoid_minutes(
                params,
                "marketCloseAvoidMinutes",
                self.market_close_avoid_minutes,
            ),
            rsi_signal_stabilization: non_negative(
                params,
                stabilization_key,
                self.rsi_signal_stabilization,
            ),
            gates: self.gates.clone(),
        }
    }

    pub fn min_candles(&self) -> usize {
        self.rsi_period + self.gates.min_history_extra
    }

    pub fn first_evaluated_index(&self) -> usize {
        self.rsi_period + self.rsi_signal_stabilization + self.gates.evaluation_offset
    }
}

fn positive(params: &StrategyParams, key: &str, default: usize) -> usize {
    let raw = params.get_i64(key, default as i64);
    if raw < 1 {
        warn!(key, value = raw, default, "parameter must be >= 1, using default");
        default
    } else {
        raw as usize
    }
}

fn non_negative(params: &StrategyParams, key: &str, default: usize) -> usize {
    let raw = params.get_i64(key, default as i64);
    if raw < 0 {
        warn!(key, value = raw, default, "parameter must be >= 0, using default");
        default
    } else {
        raw as usize
    }
}

const MINUTES_PER_DAY: i64 = 24 * 60;

fn avoid_minutes(params: &StrategyParams, key: &str, default: i64) -> i64 {
    let raw = params.get_i64(key, default);
    let clamped = raw.clamp(0, MINUTES_PER_DAY);
    if clamped != raw {
        warn!(key, value = raw, clamped, "parameter outside 0..=1440 minutes, clamping");
    }
    clamped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySignal {
    OversoldRecovery,
    PriceStableDivergence,
    VolumeMomentum,
}

impl EntrySignal {
    pub fn label(self) -> &'static str {
        match self {
            EntrySignal::OversoldRecovery => "OVERSOLD_RECOVERY",
            EntrySignal::PriceStableDivergence => "PRICE_STABLE_DIVERGENCE",
            EntrySignal::VolumeMomentum => "VOLUME_MOMENTUM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    Overbought,
    DivergenceNegative,
    ProfitTarget,
    TimeExit,
    StopLoss,
}

impl ExitSignal {
    pub fn label(self) -> &'static str {
        match self {
            ExitSignal::Overbought => "OVERBOUGHT",
            ExitSignal::DivergenceNegative => "DIVERGENCE_NEGATIVE",
            ExitSignal::ProfitTarget => "PROFIT_TARGET",
            ExitSignal::TimeExit => "TIME_EXIT",
            ExitSignal::StopLoss => "STOP_LOSS",
        }
    }
}

/// Everything the entry/exit rules look at for one candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleSnapshot {
    pub rsi: f64,
    pub prev_rsi: f64,
    pub rsi_stable: bool,
    pub trend_up: bool,
    pub trend_down: bool,
    /// |close - prev close| / prev close, in percent.
    pub price_change_pct: f64,
    /// Closes i, i-1, i-3 within twice the stability threshold.
    pub price_stable: bool,
    pub close: f64,
    pub volume: f64,
    pub avg_volume: f64,
}

impl CandleSnapshot {
    /// Build the snapshot for candle `i` from aligned RSI, close and volume series.
    /// `i` must be at least `max(3, trend_periods, stability_lookback)`.
    pub fn at(
        i: usize,
        rsi: &[f64],
        closes: &[f64],
        volumes: &[f64],
        config: &RsiDeviationConfig,
    ) -> Self {
        let gates = &config.gates;
        let close = closes[i];
        let prev_close = closes[i - 1];
        let price_change_pct = (close - prev_close).abs() / prev_close * 100.0;

        let older = closes[i - 3];
        let max = close.max(prev_close).max(older);
        let min = close.min(prev_close).min(older);
        let range_pct = (max - min) / min * 100.0;

        Self {
            rsi: rsi[i],
            prev_rsi: rsi[i - 1],
            rsi_stable: is_stable(
                rsi,
                i,
                gates.stability_lookback,
                gates.stability_max_deviation,
            ),
            trend_up: is_trending(rsi, i, gates.trend_periods, |newer, older| newer > older),
            trend_down: is_trending(rsi, i, gates.trend_periods, |newer, older| newer < older),
            price_change_pct,
            price_stable: range_pct <= config.price_stability_threshold_percent * 2.0,
            close,
            volume: volumes[i],
            avg_volume: trailing_mean(volumes, i, gates.volume_window),
        }
    }
}

/// Last `lookback` values all within `max_deviation` of their mean.
fn is_stable(values: &[f64], i: usize, lookback: usize, max_deviation: f64) -> bool {
    if lookback == 0 || i + 1 < lookback {
        return false;
    }
    let window = &values[i + 1 - lookback..=i];
    let mean = simple_average(window);
    window.iter().all(|v| (v - mean).abs() <= max_deviation)
}

/// Each of the last `periods - 1` steps satisfies `step(newer, older)`.
fn is_trending(values: &[f64], i: usize, periods: usize, step: impl Fn(f64, f64) -> bool) -> bool {
    if i < periods {
        return false;
    }
    (1..periods).all(|k| step(values[i + 1 - k], values[i - k]))
}

/// Entry rule in priority order. Caller guarantees the position is flat.
pub fn entry_signal(
    config: &RsiDeviationConfig,
    snap: &CandleSnapshot,
    can_trade: bool,
) -> Option<EntrySignal> {
    if !can_trade {
        return None;
    }
    let gates = &config.gates;
    let in_band = |(lo, hi): (f64, f64)| snap.rsi > lo && snap.rsi < hi;

    let oversold_recovery = snap.rsi_stable
        && snap.prev_rsi <= config.oversold_threshold - gates.reversal_margin
        && snap.rsi >= config.oversold_threshold + config.rsi_confirmation_buffer
        && snap.trend_up;

    let stable_divergence = snap.rsi_stable
        && snap.price_stable
        && snap.rsi - snap.prev_rsi >= config.min_rsi_positive_difference
        && in_band(gates.divergence_band)
        && snap.trend_up;

    let volume_momentum = in_band(gates.momentum_band)
        && snap.trend_up
        && snap.volume > snap.avg_volume * gates.volume_surge
        && snap.price_change_pct <= gates.momentum_max_change_pct;

    if oversold_recovery {
        Some(EntrySignal::OversoldRecovery)
    } else if stable_divergence {
        Some(EntrySignal::PriceStableDivergence)
    } else if volume_momentum {
        Some(EntrySignal::VolumeMomentum)
    } else {
        None
    }
}

/// Exit rule with its priority label. Caller guarantees a long position
/// entered at `entry_price`, `held_candles` ago.
pub fn exit_signal(
    config: &RsiDeviationConfig,
    snap: &CandleSnapshot,
    entry_price: f64,
    held_candles: usize,
) -> Option<ExitSignal> {
    let gates = &config.gates;
    let overbought = snap.prev_rsi >= config.overbought_threshold + gates.reversal_margin
        && snap.rsi <= config.overbought_threshold - config.rsi_confirmation_buffer
        && snap.trend_down;

    let negative_divergence = snap.price_stable
        && snap.rsi - snap.prev_rsi <= -config.min_rsi_positive_difference
        && snap.rsi > gates.negative_divergence_floor;

    let move_pct = if entry_price > 0.0 {
        (snap.close - entry_price) / entry_price * 100.0
    } else {
        0.0
    };
    let profit_target = entry_price > 0.0 && move_pct >= config.min_profit_target;
    let stop_loss = entry_price > 0.0 && -move_pct >= config.stop_loss_percent;
    let time_exit = held_candles > gates.max_holding_candles;

    if overbought {
        Some(ExitSignal::Overbought)
    } else if negative_divergence {
        Some(ExitSignal::DivergenceNegative)
    } else if profit_target {
        Some(ExitSignal::ProfitTarget)
    } else if time_exit {
        Some(ExitSignal::TimeExit)
    } else if stop_loss {
        Some(ExitSignal::StopLoss)
    } else {
        None
    }
}

/// RSI deviation strategy, configured by a preset that run params override.
#[derive(Debug, Clone, Default)]
pub struct RsiDeviation {
    preset: RsiDeviationConfig,
}

impl RsiDeviation {
    pub fn new(preset: RsiDeviationConfig) -> Self {
        Self { preset }
    }

    pub fn preset(&self) -> &RsiDeviationConfig {
        &self.preset
    }
}

impl Strategy for RsiDeviation {
    fn name(&self) -> String {
        self.preset.name.clone()
    }

    fn generate_signals(&self, candles: &[Candle], params: &StrategyParams) -> Vec<Action> {
        let config = self.preset.resolve(params);
        let orders = OrderSettings::from_params(params);
        let n = candles.len();

        info!(
            strategy = %config.name,
            rsi_period = config.rsi_period,
            price_stability_pct = config.price_stability_threshold_percent,
            min_rsi_diff = config.min_rsi_positive_difference,
            min_gap = config.min_candles_between_trades,
            avoid_open_close = config.avoid_market_open_close,
            symbol = %orders.trading_symbol,
            exchange = %orders.exchange,
            product_type = %orders.product_type,
            candles = n,
            "generating signals"
        );

        if n < config.min_candles() {
            warn!(
                strategy = %config.name,
                available = n,
                required = config.min_candles(),
                "not enough candles for RSI signals"
            );
            return Vec::new();
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles
            .iter()
            .map(|c| if c.volume == 0 { 1.0 } else { c.volume as f64 })
            .collect();
        let rsi = wilder_rsi(&closes, config.rsi_period);

        let rsi_values = n - config.rsi_period;
        let required_values = config.rsi_signal_stabilization + config.gates.min_rsi_values_extra;
        if rsi_values < required_values {
            warn!(
                strategy = %config.name,
                available = rsi_values,
                required = required_values,
                "not enough RSI values after stabilization"
            );
            return Vec::new();
        }

        let gates = &config.gates;
        let start = config.first_evaluated_index().max(3);
        let end = n.saturating_sub(gates.trailing_guard);

        let mut signals = Vec::new();
        let mut entry_price: Option<f64> = None;
        let mut last_trade: Option<usize> = None;

        for i in start..end {
            let candle = &candles[i];

            if config.avoid_market_open_close
                && gates.session.is_near_open_or_close(
                    candle,
                    config.market_open_avoid_minutes,
                    config.market_close_avoid_minutes,
                )
            {
                continue;
            }

            let snap = CandleSnapshot::at(i, &rsi, &closes, &volumes, &config);
            if snap.volume < snap.avg_volume * gates.volume_floor {
                continue;
            }

            let since_last = last_trade.map(|last| i - last);
            match entry_price {
                None => {
                    let can_trade =
                        since_last.map_or(true, |gap| gap >= config.min_candles_between_trades);
                    if let Some(entry) = entry_signal(&config, &snap, can_trade) {
                        debug!(
                            reason = entry.label(),
                            timestamp = %candle.timestamp,
                            prev_rsi = snap.prev_rsi,
                            rsi = snap.rsi,
                            price = snap.close,
                            volume = snap.volume,
                            "entry signal"
                        );
                        signals.push(
                            Action::buy(
                                candle.timestamp,
                                snap.close,
                                orders.quantity,
                                orders.order_details(),
                            )
                            .with_reason(entry.label()),
                        );
                        entry_price = Some(snap.close);
                        last_trade = Some(i);
                    }
                }
                Some(price) => {
                    let held = since_last.unwrap_or(0);
                    if let Some(exit) = exit_signal(&config, &snap, price, held) {
                        debug!(
                            reason = exit.label(),
                            timestamp = %candle.timestamp,
                            prev_rsi = snap.prev_rsi,
                            rsi = snap.rsi,
                            price = snap.close,
                            pnl_pct = (snap.close - price) / price * 100.0,
                            "exit signal"
                        );
                        signals.push(
                            Action::sell(
                                candle.timestamp,
                                snap.close,
                                orders.quantity,
                                orders.order_details(),
                            )
                            .with_reason(exit.label()),
                        );
                        entry_price = None;
                        last_trade = Some(i);
                    }
                }
            }
        }

        info!(strategy = %config.name, signals = signals.len(), "signals generated");
        signals
    }

    fn indicator_data(&self, candles: &[Candle], params: &StrategyParams) -> IndicatorSeries {
        let config = self.preset.resolve(params);
        let period = config.rsi_period;
        let mut series = IndicatorSeries::new();
        if candles.len() <= period {
            return series;
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let rsi = wilder_rsi(&closes, period);
        let band = |level: f64| -> Vec<f64> {
            rsi.iter()
                .map(|v| if v.is_nan() { f64::NAN } else { level })
                .collect()
        };
        series.insert("RSI_Overbought".to_string(), band(config.overbought_threshold));
        series.insert("RSI_Oversold".to_string(), band(config.oversold_threshold));
        series.insert(format!("RSI({period})"), rsi);
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionKind;
    use crate::indicators::make_candles;

    fn snapshot() -> CandleSnapshot {
        CandleSnapshot {
            rsi: 50.0,
            prev_rsi: 50.0,
            rsi_stable: true,
            trend_up: false,
            trend_down: false,
            price_change_pct: 0.0,
            price_stable: false,
            close: 100.0,
            volume: 1000.0,
            avg_volume: 1000.0,
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = RsiDeviationConfig::default();
        assert_eq!(c.rsi_period, 14);
        assert_eq!(c.oversold_threshold, 25.0);
        assert_eq!(c.overbought_threshold, 75.0);
        assert_eq!(c.rsi_confirmation_buffer, 2.0);
        assert_eq!(c.price_stability_threshold_percent, 0.15);
        assert_eq!(c.min_rsi_positive_difference, 2.0);
        assert_eq!(c.min_candles_between_trades, 10);
        assert_eq!(c.min_profit_target, 0.2);
        assert_eq!(c.stop_loss_percent, 0.4);
        assert!(c.avoid_market_open_close);
        assert_eq!(c.rsi_signal_stabilization, 15);
        assert_eq!(c.first_evaluated_index(), 34);
        assert_eq!(c.min_candles(), 34);
    }

    #[test]
    fn params_override_preset() {
        let params = StrategyParams::new()
            .with("rsiPeriod", 7)
            .with("oversoldThreshold", 30.0)
            .with("rsiSignalStabilizationCount", 4)
            .with("avoidMarketOpenClose", false);
        let c = RsiDeviationConfig::price_deviation().resolve(&params);
        assert_eq!(c.name, "RSI Price Deviation");
        assert_eq!(c.rsi_period, 7);
        assert_eq!(c.oversold_threshold, 30.0);
        assert_eq!(c.rsi_signal_stabilization, 4);
        assert!(!c.avoid_market_open_close);

        // the primary key wins over the alias
        let both = params.with("rsiSignalStabilization", 9);
        assert_eq!(RsiDeviationConfig::default().resolve(&both).rsi_signal_stabilization, 9);
    }

    #[test]
    fn stability_and_trend_helpers() {
        let rsi = [10.0, 48.0, 50.0, 51.5];
        assert!(is_stable(&rsi, 3, 3, 2.0));
        assert!(!is_stable(&rsi, 2, 3, 2.0));
        assert!(is_trending(&rsi, 3, 3, |a, b| a > b));
        assert!(!is_trending(&rsi, 3, 3, |a, b| a < b));
        assert!(!is_trending(&rsi, 2, 3, |a, b| a > b));
    }

    #[test]
    fn overbought_reversal_exit() {
        // RSI series [.., 80, 79, 72]: falling twice, prev >= 77, now <= 73
        let rsi = [50.0, 80.0, 79.0, 72.0];
        let closes = [100.0, 100.2, 100.1, 100.0];
        let volumes = [1000.0; 4];
        let config = RsiDeviationConfig::default();
        let snap = CandleSnapshot::at(3, &rsi, &closes, &volumes, &config);
        assert!(snap.trend_down);
        assert_eq!(
            exit_signal(&config, &snap, 100.0, 5),
            Some(ExitSignal::Overbought)
        );
    }

    #[test]
    fn exit_priority_order() {
        let config = RsiDeviationConfig::default();
        let mut snap = snapshot();

        // profit target beats time exit
        snap.close = 101.0;
        assert_eq!(exit_signal(&config, &snap, 100.0, 60), Some(ExitSignal::ProfitTarget));

        // time exit beats stop loss
        snap.close = 99.0;
        assert_eq!(exit_signal(&config, &snap, 100.0, 60), Some(ExitSignal::TimeExit));
        assert_eq!(exit_signal(&config, &snap, 100.0, 50), Some(ExitSignal::StopLoss));

        // negative divergence beats profit target
        snap.close = 101.0;
        snap.price_stable = true;
        snap.prev_rsi = 60.0;
        snap.rsi = 55.0;
        assert_eq!(
            exit_signal(&config, &snap, 100.0, 1),
            Some(ExitSignal::DivergenceNegative)
        );

        // flat price, short hold: nothing
        let idle = snapshot();
        assert_eq!(exit_signal(&config, &idle, 100.0, 3), None);
    }

    #[test]
    fn entries_require_spacing() {
        let config = RsiDeviationConfig::default();
        let snap = CandleSnapshot {
            rsi: 28.0,
            prev_rsi: 22.0,
            trend_up: true,
            ..snapshot()
        };
        assert_eq!(entry_signal(&config, &snap, true), Some(EntrySignal::OversoldRecovery));
        assert_eq!(entry_signal(&config, &snap, false), None);

        let unstable = CandleSnapshot {
            rsi_stable: false,
            ..snap
        };
        assert_eq!(entry_signal(&config, &unstable, true), None);
    }

    #[test]
    fn volume_momentum_entry_skips_stability() {
        let config = RsiDeviationConfig::default();
        let snap = CandleSnapshot {
            rsi: 52.0,
            prev_rsi: 51.0,
            rsi_stable: false,
            trend_up: true,
            price_change_pct: 0.05,
            volume: 2000.0,
            avg_volume: 1050.0,
            ..snapshot()
        };
        assert_eq!(entry_signal(&config, &snap, true), Some(EntrySignal::VolumeMomentum));
    }

    #[test]
    fn rising_series_emits_nothing() {
        let closes: Vec<f64> = (0..44).map(|i| 100.0 + i as f64).collect();
        let candles = make_candles(&closes);
        let strategy = RsiDeviation::default();
        let params = StrategyParams::new().with("avoidMarketOpenClose", false);

        let rsi = &strategy.indicator_data(&candles, &params)["RSI(14)"];
        assert!(rsi[14..].iter().all(|v| (v - 100.0).abs() < 1e-9));

        let signals = strategy.generate_signals(&candles, &params);
        assert!(signals
            .iter()
            .all(|s| s.reason.as_deref() != Some("STOP_LOSS")));
        assert!(signals.is_empty());
    }

    #[test]
    fn avoid_minutes_are_clamped_to_a_day() {
        let params = StrategyParams::new()
            .with("marketOpenAvoidMinutes", i64::MAX)
            .with("marketCloseAvoidMinutes", -5);
        let c = RsiDeviationConfig::default().resolve(&params);
        assert_eq!(c.market_open_avoid_minutes, 1440);
        assert_eq!(c.market_close_avoid_minutes, 0);
    }

    #[test]
    fn huge_avoid_window_does_not_abort_generation() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i % 5) as f64).collect();
        let candles = make_candles(&closes);
        let params = StrategyParams::new().with("marketOpenAvoidMinutes", i64::MAX);
        let signals = RsiDeviation::default().generate_signals(&candles, &params);
        assert!(signals.iter().all(|s| s.kind != ActionKind::Hold));
    }

    #[test]
    fn short_history_yields_nothing() {
        let closes: Vec<f64> = (0..33).map(|i| 100.0 + (i % 3) as f64).collect();
        let candles = make_candles(&closes);
        assert!(RsiDeviation::default()
            .generate_signals(&candles, &StrategyParams::new())
            .is_empty());
    }

    #[test]
    fn indicator_bands_follow_rsi_warmup() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i % 4) as f64).collect();
        let candles = make_candles(&closes);
        let data = RsiDeviation::default().indicator_data(&candles, &StrategyParams::new());
        assert_eq!(data.len(), 3);
        assert!(data["RSI_Overbought"][13].is_nan());
        assert_eq!(data["RSI_Overbought"][14], 75.0);
        assert_eq!(data["RSI_Oversold"][19], 25.0);
        assert!(data["RSI(14)"][14].is_finite());

        let too_short = make_candles(&closes[..14]);
        assert!(RsiDeviation::default()
            .indicator_data(&too_short, &StrategyParams::new())
            .is_empty());
    }

    /// Zigzag around 1000 keeps RSI near 50 without a 3-step trend, then two
    /// small gains on doubled volume trigger the momentum entry at candle 42.
    fn momentum_setup() -> (Vec<f64>, usize) {
        let mut closes: Vec<f64> = (0..41).map(|k| 1000.0 + (k % 2) as f64).collect();
        closes.extend([1000.5, 1001.0]);
        (closes, 42)
    }

    fn candles_with_surge(closes: &[f64], surge_at: usize) -> Vec<Candle> {
        let mut candles = make_candles(closes);
        candles[surge_at].volume = 2000;
        candles
    }

    #[test]
    fn momentum_entry_then_profit_target() {
        let (mut closes, entry_at) = momentum_setup();
        closes.extend([1003.5; 7]);
        let candles = candles_with_surge(&closes, entry_at);
        let params = StrategyParams::new().with("avoidMarketOpenClose", false);

        let signals = RsiDeviation::default().generate_signals(&candles, &params);
        assert_eq!(signals.len(), 2, "signals: {signals:?}");
        assert_eq!(signals[0].kind, ActionKind::Buy);
        assert_eq!(signals[0].timestamp, candles[entry_at].timestamp);
        assert_eq!(signals[0].reason.as_deref(), Some("VOLUME_MOMENTUM"));
        assert_eq!(signals[1].kind, ActionKind::Sell);
        assert_eq!(signals[1].timestamp, candles[entry_at + 1].timestamp);
        assert_eq!(signals[1].reason.as_deref(), Some("PROFIT_TARGET"));
    }

    #[test]
    fn thin_volume_candle_is_skipped() {
        let (mut closes, entry_at) = momentum_setup();
        closes.extend([1003.5; 7]);
        let mut candles = make_candles(&closes);
        // trailing average stays near 1000, floor is half of it
        candles[entry_at].volume = 400;
        let params = StrategyParams::new().with("avoidMarketOpenClose", false);

        let signals = RsiDeviation::default().generate_signals(&candles, &params);
        assert!(
            signals.iter().all(|s| s.kind != ActionKind::Buy),
            "signals: {signals:?}"
        );
    }

    #[test]
    fn last_five_candles_are_never_evaluated() {
        let params = StrategyParams::new().with("avoidMarketOpenClose", false);
        let (closes, entry_at) = momentum_setup();

        // four trailing candles leave the trigger inside the guard band
        let mut guarded = closes.clone();
        guarded.extend([1003.5; 4]);
        let candles = candles_with_surge(&guarded, entry_at);
        assert!(RsiDeviation::default()
            .generate_signals(&candles, &params)
            .is_empty());

        // one more candle moves it out
        let mut open = closes;
        open.extend([1003.5; 5]);
        let candles = candles_with_surge(&open, entry_at);
        let signals = RsiDeviation::default().generate_signals(&candles, &params);
        assert_eq!(signals.first().map(|s| s.timestamp), Some(candles[entry_at].timestamp));
    }

    #[test]
    fn rally_then_reversal_exits_overbought() {
        let (mut closes, entry_at) = momentum_setup();
        for _ in 0..8 {
            let last = closes[closes.len() - 1];
            closes.push(last + 3.0);
        }
        // 1025 → 1024 → 1016: RSI falls from ~87 to ~83 and then below 73
        closes.extend([1024.0, 1016.0]);
        closes.extend([1016.0; 6]);
        let candles = candles_with_surge(&closes, entry_at);
        let params = StrategyParams::new()
            .with("avoidMarketOpenClose", false)
            .with("minProfitTarget", 100.0)
            .with("stopLossPercent", 100.0);

        let signals = RsiDeviation::default().generate_signals(&candles, &params);
        assert_eq!(signals.len(), 2, "signals: {signals:?}");
        assert_eq!(signals[0].reason.as_deref(), Some("VOLUME_MOMENTUM"));
        assert_eq!(signals[1].kind, ActionKind::Sell);
        assert_eq!(signals[1].timestamp, candles[52].timestamp);
        assert_eq!(signals[1].reason.as_deref(), Some("OVERBOUGHT"));
        assert_eq!(signals[1].price, 1016.0);
    }

    #[test]
    fn session_filter_blocks_entry_outside_window() {
        let (mut closes, entry_at) = momentum_setup();
        closes.extend([1003.5; 7]);
        let candles = candles_with_surge(&closes, entry_at);
        // candle 42 sits at 19:45 local, outside 09:30–15:15
        let signals = RsiDeviation::default().generate_signals(&candles, &StrategyParams::new());
        assert!(signals.is_empty());
    }

    #[test]
    fn signals_alternate_starting_with_buy() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + 3.0 * ((i as f64) * 0.7).sin() + i as f64 * 0.05)
            .collect();
        let candles = make_candles(&closes);
        let params = StrategyParams::new().with("avoidMarketOpenClose", false);
        let signals = RsiDeviation::default().generate_signals(&candles, &params);
        if let Some(first) = signals.first() {
            assert_eq!(first.kind, ActionKind::Buy);
        }
        for pair in signals.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind, "signals must alternate");
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }
}
