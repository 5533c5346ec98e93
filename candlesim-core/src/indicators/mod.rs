//! Indicator trait and the concrete indicators the strategies use.
//!
//! Indicators are pure functions: candle history in, numeric series out,
//! aligned 1:1 with the input and `f64::NAN` during warmup. No value at
//! index t may depend on candles after t.

pub mod rsi;
pub mod sma;

pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::Candle;

pub trait Indicator: Send + Sync {
    /// Display name, e.g. `"SMA(20)"`. Doubles as the indicator-series key.
    fn name(&self) -> &str;

    /// Number of leading values that are NaN.
    fn lookback(&self) -> usize;

    /// Compute over the entire series. Output length equals `candles.len()`.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Arithmetic mean; `0.0` for an empty slice.
pub fn simple_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of the up-to-`window` values ending at index `end` (inclusive).
pub fn trailing_mean(values: &[f64], end: usize, window: usize) -> f64 {
    if values.is_empty() || window == 0 {
        return 0.0;
    }
    let end = end.min(values.len() - 1);
    let start = (end + 1).saturating_sub(window);
    simple_average(&values[start..=end])
}

/// Candles from close prices, 15 minutes apart from 09:15 IST.
///
/// open = prev close (or close for the first), high/low = body ± 1.0, volume = 1000.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::{DateTime, Duration};
    let start = DateTime::parse_from_rfc3339("2024-03-15T09:15:00+05:30").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::new(
                start + Duration::minutes(15 * i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000,
            )
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
