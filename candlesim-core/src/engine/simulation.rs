//! Candle-by-candle replay of a strategy's signals against the ledger.
//!
//! The strategy proposes a time-ordered signal stream up front; the engine
//! then walks the candles, pairing each candle with the next pending signal
//! whose timestamp matches exactly:
//!
//! 1. Drop pending signals older than the candle (counted as unmatched)
//! 2. Apply a matching signal through the ledger, if any
//! 3. Record the mark-to-market equity point
//!
//! After the last candle an open position is squared off at the final close.

use tracing::{debug, info, warn};

use crate::domain::{
    Action, ActionKind, Candle, EquityPoint, Exchange, ProductType, Side, TradeLogEntry,
    SQUAREOFF_END,
};
use crate::strategy::Strategy;

use super::fee_model::FeeModel;
use super::ledger::{Ledger, LedgerRejection};
use super::report::{profit_percentage, ReplayDiagnostics, Report};
use super::state::RunConfig;

/// One backtest run. Build a new engine per run; `run` consumes it.
pub struct SimulationEngine<'a> {
    strategy: &'a dyn Strategy,
    candles: &'a [Candle],
    config: RunConfig,
    fees: FeeModel,
    ledger: Ledger,
    trades: Vec<TradeLogEntry>,
    equity_curve: Vec<EquityPoint>,
    diagnostics: ReplayDiagnostics,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(strategy: &'a dyn Strategy, candles: &'a [Candle], config: RunConfig) -> Self {
        let ledger = Ledger::new(config.initial_capital);
        Self {
            strategy,
            candles,
            config,
            fees: FeeModel::default(),
            ledger,
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(candles.len()),
            diagnostics: ReplayDiagnostics::default(),
        }
    }

    pub fn with_fee_model(mut self, fees: FeeModel) -> Self {
        self.fees = fees;
        self
    }

    pub fn run(self) -> Report {
        self.run_observed(|_, _| {})
    }

    /// Like [`run`](Self::run), calling `observer` with the ledger after
    /// each candle has been processed (before the end-of-data square-off).
    pub fn run_observed<F>(mut self, mut observer: F) -> Report
    where
        F: FnMut(&Ledger, &Candle),
    {
        let strategy_name = self.strategy.name();
        let mut signals = self
            .strategy
            .generate_signals(self.candles, &self.config.strategy_params);

        let before = signals.len();
        signals.retain(|a| !a.is_hold());
        if signals.len() != before {
            warn!(
                strategy = %strategy_name,
                dropped = before - signals.len(),
                "strategy emitted HOLD actions; ignoring them"
            );
        }
        self.diagnostics.signals_received = signals.len();

        info!(
            strategy = %strategy_name,
            candles = self.candles.len(),
            signals = signals.len(),
            initial_capital = self.config.initial_capital,
            shares_per_trade = self.config.shares_per_trade,
            "starting replay"
        );

        let candles = self.candles;
        let mut pending = signals.iter().peekable();
        for candle in candles {
            while let Some(stale) = pending.next_if(|a| a.timestamp < candle.timestamp) {
                self.diagnostics.unmatched_signals += 1;
                debug!(
                    signal_ts = %stale.timestamp,
                    candle_ts = %candle.timestamp,
                    kind = %stale.kind,
                    "signal has no matching candle, skipping"
                );
            }

            if let Some(action) = pending.next_if(|a| a.timestamp == candle.timestamp) {
                self.apply(action);
            }

            self.equity_curve.push(EquityPoint {
                timestamp: candle.timestamp,
                value: self.ledger.mark_to_market(candle.close),
            });
            debug_assert!(self.ledger.invariants_hold());
            observer(&self.ledger, candle);
        }

        let leftover = pending.count();
        if leftover > 0 {
            debug!(leftover, "signals after the last candle");
            self.diagnostics.unmatched_signals += leftover;
        }

        if let Some(last) = candles.last() {
            self.square_off(last);
        }

        self.finish(strategy_name)
    }

    fn apply(&mut self, action: &Action) {
        match action.kind {
            ActionKind::Buy => self.apply_buy(action),
            ActionKind::Sell => self.apply_sell(action),
            ActionKind::Hold => {}
        }
    }

    /// Entries are sized by `shares_per_trade`; the signal's own quantity is
    /// informational only.
    fn apply_buy(&mut self, action: &Action) {
        let quantity = self.config.shares_per_trade;
        let context = FeeContext::of(action);
        let charges = self.fees.total_charges(
            action.price,
            fee_quantity(quantity),
            Side::Buy,
            &context.product_type,
            &context.exchange,
        );

        match self.ledger.apply_buy(action.price, quantity, charges) {
            Ok(()) => {
                self.diagnostics.signals_applied += 1;
                debug!(
                    timestamp = %action.timestamp,
                    price = action.price,
                    quantity,
                    charges,
                    cash = self.ledger.cash(),
                    "BUY filled"
                );
                self.trades.push(TradeLogEntry::new(
                    Side::Buy.to_string(),
                    action.timestamp,
                    quantity,
                    action.price,
                    charges,
                ));
            }
            Err(rejection) => self.reject(action, rejection),
        }
    }

    fn apply_sell(&mut self, action: &Action) {
        if self.ledger.is_flat() {
            self.reject(action, LedgerRejection::NotLong);
            return;
        }
        let quantity = self.ledger.shares_held();
        let context = FeeContext::of(action);
        let charges = self.fees.total_charges(
            action.price,
            fee_quantity(quantity),
            Side::Sell,
            &context.product_type,
            &context.exchange,
        );

        match self.ledger.apply_sell(action.price, charges) {
            Ok(closed) => {
                self.diagnostics.signals_applied += 1;
                debug!(
                    timestamp = %action.timestamp,
                    price = action.price,
                    quantity = closed.quantity,
                    entry_price = closed.entry_price,
                    charges,
                    cash = self.ledger.cash(),
                    "SELL filled"
                );
                self.trades.push(TradeLogEntry::new(
                    Side::Sell.to_string(),
                    action.timestamp,
                    closed.quantity,
                    action.price,
                    charges,
                ));
            }
            Err(rejection) => self.reject(action, rejection),
        }
    }

    fn reject(&mut self, action: &Action, rejection: LedgerRejection) {
        match rejection {
            LedgerRejection::InsufficientCash { .. } => {
                self.diagnostics.rejected_insufficient_cash += 1
            }
            LedgerRejection::AlreadyLong | LedgerRejection::NotLong => {
                self.diagnostics.rejected_wrong_state += 1
            }
            LedgerRejection::InvalidOrder { .. } => self.diagnostics.rejected_invalid_order += 1,
        }
        debug!(
            timestamp = %action.timestamp,
            kind = %action.kind,
            price = action.price,
            reason = %rejection,
            "signal rejected by ledger"
        );
    }

    /// Close any open position at the last candle's close. The exit is
    /// charged as an unclassified `SQUAREOFF` product on no exchange, which
    /// the fee model bills as flat brokerage plus GST and the SEBI fee.
    fn square_off(&mut self, last: &Candle) {
        if self.ledger.is_flat() {
            return;
        }
        let quantity = self.ledger.shares_held();
        let context = FeeContext::square_off();
        let charges = self.fees.total_charges(
            last.close,
            fee_quantity(quantity),
            Side::Sell,
            &context.product_type,
            &context.exchange,
        );

        if let Ok(closed) = self.ledger.apply_sell(last.close, charges) {
            self.diagnostics.forced_square_off = true;
            self.trades.push(TradeLogEntry::new(
                SQUAREOFF_END.to_string(),
                last.timestamp,
                closed.quantity,
                last.close,
                charges,
            ));
            if let Some(point) = self.equity_curve.last_mut() {
                point.value = self.ledger.cash();
            }
            info!(
                timestamp = %last.timestamp,
                price = last.close,
                quantity = closed.quantity,
                charges,
                cash = self.ledger.cash(),
                "squared off open position at end of data"
            );
        }
    }

    fn finish(self, strategy: String) -> Report {
        let initial_capital = self.config.initial_capital;
        let final_capital = self.ledger.cash();
        let report = Report {
            strategy,
            initial_capital,
            final_capital,
            net_profit: final_capital - initial_capital,
            profit_percentage: profit_percentage(initial_capital, final_capital),
            total_trades: self.trades.len(),
            trades: self.trades,
            equity_curve: self.equity_curve,
            source_candles: self.candles.to_vec(),
            diagnostics: self.diagnostics,
        };
        info!(
            strategy = %report.strategy,
            final_capital = report.final_capital,
            net_profit = report.net_profit,
            trades = report.total_trades,
            applied = report.diagnostics.signals_applied,
            rejected = report.diagnostics.rejected(),
            unmatched = report.diagnostics.unmatched_signals,
            "replay complete"
        );
        report
    }
}

/// Run one backtest with the default fee schedule.
pub fn run_backtest(strategy: &dyn Strategy, candles: &[Candle], config: RunConfig) -> Report {
    SimulationEngine::new(strategy, candles, config).run()
}

/// Product and exchange a fill is charged under.
struct FeeContext {
    product_type: ProductType,
    exchange: Exchange,
}

impl FeeContext {
    fn of(action: &Action) -> Self {
        match &action.order {
            Some(order) => Self {
                product_type: order.product(),
                exchange: order.exchange(),
            },
            None => Self {
                product_type: ProductType::Unknown(String::new()),
                exchange: Exchange::Other(String::new()),
            },
        }
    }

    fn square_off() -> Self {
        Self {
            product_type: ProductType::Unknown(SQUAREOFF_PRODUCT.to_string()),
            exchange: Exchange::Other(SQUAREOFF_EXCHANGE.to_string()),
        }
    }
}

const SQUAREOFF_PRODUCT: &str = "SQUAREOFF";
const SQUAREOFF_EXCHANGE: &str = "UNKNOWN";

fn fee_quantity(quantity: u64) -> i64 {
    i64::try_from(quantity).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderDetails;
    use crate::indicators::make_candles;
    use crate::strategy::{IndicatorSeries, StrategyParams};

    /// Replays a fixed action list regardless of input.
    struct Scripted(Vec<Action>);

    impl Strategy for Scripted {
        fn name(&self) -> String {
            "Scripted".into()
        }
        fn generate_signals(&self, _: &[Candle], _: &StrategyParams) -> Vec<Action> {
            self.0.clone()
        }
        fn indicator_data(&self, _: &[Candle], _: &StrategyParams) -> IndicatorSeries {
            IndicatorSeries::new()
        }
    }

    fn delivery() -> OrderDetails {
        OrderDetails::market("1", "TEST", "NSE", "DELIVERY")
    }

    fn config(capital: f64, shares: u64) -> RunConfig {
        RunConfig::new(capital, shares, StrategyParams::default())
    }

    #[test]
    fn empty_candles_produce_flat_report() {
        let strategy = Scripted(Vec::new());
        let report = run_backtest(&strategy, &[], RunConfig::default());
        assert_eq!(report.final_capital, 100_000.0);
        assert_eq!(report.net_profit, 0.0);
        assert!(report.trades.is_empty());
        assert!(report.equity_curve.is_empty());
        assert!(!report.diagnostics.forced_square_off);
    }

    #[test]
    fn delivery_round_trip_books_exact_fees() {
        let candles = make_candles(&[100.0, 100.0, 110.0, 110.0]);
        let strategy = Scripted(vec![
            Action::buy(candles[1].timestamp, 100.0, 1, delivery()),
            Action::sell(candles[2].timestamp, 110.0, 1, delivery()),
        ]);
        let report = run_backtest(&strategy, &candles, config(10_000.0, 10));

        let fees = FeeModel::default();
        let buy_fee = fees.total_charges(100.0, 10, Side::Buy, &ProductType::Delivery, &Exchange::Nse);
        let sell_fee =
            fees.total_charges(110.0, 10, Side::Sell, &ProductType::Delivery, &Exchange::Nse);
        let expected = 10_000.0 - 1000.0 - buy_fee + 1100.0 - sell_fee;

        assert_eq!(report.trades.len(), 2);
        assert_eq!(report.trades[0].quantity, 10);
        assert!((report.final_capital - expected).abs() < 1e-9);
        assert_eq!(report.diagnostics.signals_applied, 2);
        assert!(!report.diagnostics.forced_square_off);
        assert_eq!(report.equity_curve.len(), candles.len());
        assert!((report.equity_curve[1].value - (10_000.0 - buy_fee)).abs() < 1e-9);
    }

    #[test]
    fn stale_signal_is_skipped_not_blocking() {
        let candles = make_candles(&[100.0, 101.0, 102.0, 103.0]);
        let off_grid = candles[0].timestamp + chrono::Duration::minutes(1);
        let strategy = Scripted(vec![
            Action::buy(off_grid, 100.0, 1, delivery()),
            Action::buy(candles[2].timestamp, 102.0, 1, delivery()),
        ]);
        let report = run_backtest(&strategy, &candles, config(10_000.0, 1));

        assert_eq!(report.diagnostics.unmatched_signals, 1);
        assert_eq!(report.diagnostics.signals_applied, 1);
        assert_eq!(report.trades[0].timestamp, candles[2].timestamp);
        assert_eq!(report.trades.last().map(|t| t.action.as_str()), Some(SQUAREOFF_END));
    }

    #[test]
    fn square_off_charges_flat_unclassified_fee_and_fixes_last_equity_point() {
        let candles = make_candles(&[100.0, 100.0, 120.0]);
        let strategy = Scripted(vec![Action::buy(candles[0].timestamp, 100.0, 1, delivery())]);
        let report = run_backtest(&strategy, &candles, config(10_000.0, 5));

        // 20 brokerage + 18% GST on it + SEBI on 600 turnover; no STT, txn or stamp
        let exit_fee = 20.0 + 3.6 + 0.000001 * 600.0;
        let last = report.trades.last().unwrap();
        assert_eq!(last.action, SQUAREOFF_END);
        assert!((last.charges - exit_fee).abs() < 1e-9, "{}", last.charges);
        assert!(report.diagnostics.forced_square_off);
        assert_eq!(report.equity_curve.last().unwrap().value, report.final_capital);
    }

    #[test]
    fn delivery_entry_squared_off_at_entry_price() {
        let candles = make_candles(&[100.0, 100.0]);
        let strategy = Scripted(vec![Action::buy(candles[0].timestamp, 100.0, 10, delivery())]);
        let report = run_backtest(&strategy, &candles, config(10_000.0, 10));

        let last = report.trades.last().unwrap();
        assert_eq!(last.action, SQUAREOFF_END);
        assert!((last.charges - 23.601).abs() < 1e-9, "{}", last.charges);

        let buy_fee =
            FeeModel::default().total_charges(100.0, 10, Side::Buy, &ProductType::Delivery, &Exchange::Nse);
        assert!((report.final_capital - (10_000.0 - buy_fee - 23.601)).abs() < 1e-9);
    }

    #[test]
    fn wrong_state_and_cash_rejections_are_counted() {
        let candles = make_candles(&[100.0, 100.0, 100.0, 100.0]);
        let strategy = Scripted(vec![
            Action::sell(candles[0].timestamp, 100.0, 1, delivery()),
            Action::buy(candles[1].timestamp, 100.0, 1, delivery()),
            Action::buy(candles[2].timestamp, 100.0, 1, delivery()),
        ]);
        let report = run_backtest(&strategy, &candles, config(500.0, 10));

        assert_eq!(report.diagnostics.signals_received, 3);
        assert_eq!(report.diagnostics.rejected_wrong_state, 1);
        assert_eq!(report.diagnostics.rejected_insufficient_cash, 2);
        assert!(report.trades.is_empty());
        assert_eq!(report.final_capital, 500.0);
    }

    #[test]
    fn observer_sees_every_candle() {
        let candles = make_candles(&[100.0, 101.0, 102.0]);
        let strategy = Scripted(vec![Action::buy(candles[1].timestamp, 101.0, 1, delivery())]);
        let mut seen = Vec::new();
        SimulationEngine::new(&strategy, &candles, config(10_000.0, 1))
            .run_observed(|ledger, candle| seen.push((candle.timestamp, ledger.shares_held())));
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].1, 0);
        assert_eq!(seen[1].1, 1);
    }
}
