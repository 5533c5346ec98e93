//! Candle: the unit of simulated time.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Number of fields in a broker historical-data row.
pub const CANDLE_TUPLE_LEN: usize = 6;

/// OHLCV sample for one fixed interval.
///
/// Timestamps keep the exchange offset they were reported with, so session
/// filters can work on the exchange's local wall clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Malformed candle input. This is the only condition that aborts a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleError {
    #[error("invalid argument: candle row has {found} elements, expected at least 6")]
    WrongArity { found: usize },

    #[error("invalid argument: candle field '{field}' is not valid: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("invalid argument: candle row {index}: {source}")]
    Row {
        index: usize,
        #[source]
        source: Box<CandleError>,
    },
}

impl Candle {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Parse a broker row `[isoTimestampWithOffset, open, high, low, close, volume]`.
    ///
    /// Rows shorter than six elements are rejected; extra trailing elements are ignored.
    /// Numeric fields may be JSON numbers or numeric strings.
    pub fn from_tuple(row: &[Value]) -> Result<Self, CandleError> {
        if row.len() < CANDLE_TUPLE_LEN {
            return Err(CandleError::WrongArity { found: row.len() });
        }

        let raw_ts = row[0].as_str().ok_or_else(|| CandleError::InvalidField {
            field: "timestamp",
            value: row[0].to_string(),
        })?;
        let timestamp =
            DateTime::parse_from_rfc3339(raw_ts).map_err(|_| CandleError::InvalidField {
                field: "timestamp",
                value: raw_ts.to_string(),
            })?;

        Ok(Self {
            timestamp,
            open: number_field(&row[1], "open")?,
            high: number_field(&row[2], "high")?,
            low: number_field(&row[3], "low")?,
            close: number_field(&row[4], "close")?,
            volume: volume_field(&row[5])?,
        })
    }

    /// Basic OHLC sanity check: high bounds the body, low bounds the body, prices positive.
    pub fn is_sane(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Parse a full historical-data payload, failing fast on the first malformed row.
pub fn candles_from_rows(rows: &[Vec<Value>]) -> Result<Vec<Candle>, CandleError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            Candle::from_tuple(row).map_err(|source| CandleError::Row {
                index,
                source: Box::new(source),
            })
        })
        .collect()
}

fn number_field(value: &Value, field: &'static str) -> Result<f64, CandleError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| CandleError::InvalidField {
            field,
            value: value.to_string(),
        })
}

fn volume_field(value: &Value) -> Result<u64, CandleError> {
    let invalid = || CandleError::InvalidField {
        field: "volume",
        value: value.to_string(),
    };
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0 && v.fract() == 0.0).map(|v| v as u64))
            .ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<u64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
