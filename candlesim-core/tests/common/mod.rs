//! Shared candle builders for the integration tests.

#![allow(dead_code)]

use candlesim_core::domain::Candle;
use chrono::{DateTime, Duration, FixedOffset};

pub fn session_start() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-03-15T09:15:00+05:30").unwrap()
}

/// Candles from close prices, 15 minutes apart, open = previous close.
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    candles_with_volume(closes, &vec![1000; closes.len()])
}

pub fn candles_with_volume(closes: &[f64], volumes: &[u64]) -> Vec<Candle> {
    let start = session_start();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::new(
                start + Duration::minutes(15 * i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                volume,
            )
        })
        .collect()
}

/// Flat, rise, fall: one golden cross then one death cross at (3, 5).
pub const CROSSOVER_CLOSES: [f64; 17] = [
    10.0, 10.0, 10.0, 10.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 10.0, 9.0, 8.0,
    7.0,
];
