//! Candlesim Core: candle replay engine, strategies, indicators and fees.
//!
//! This crate contains the deterministic heart of the simulator:
//! - Domain types (candles, actions, order details, trade log, equity points)
//! - Indicators with NaN warmup (SMA, Wilder RSI)
//! - Strategies that turn candles into a BUY/SELL signal stream
//! - The replay engine, ledger and Indian-market fee schedule

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed to sweep workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::Action>();
        require_sync::<domain::Action>();
        require_send::<domain::TradeLogEntry>();
        require_sync::<domain::TradeLogEntry>();

        require_send::<strategy::StrategyParams>();
        require_sync::<strategy::StrategyParams>();
        require_send::<Box<dyn strategy::Strategy>>();
        require_sync::<Box<dyn strategy::Strategy>>();

        require_send::<engine::FeeModel>();
        require_sync::<engine::FeeModel>();
        require_send::<engine::RunConfig>();
        require_sync::<engine::RunConfig>();
        require_send::<engine::Report>();
        require_sync::<engine::Report>();
    }

    #[test]
    fn send_sync_check_compiles() {
        assert_send_sync();
    }
}
