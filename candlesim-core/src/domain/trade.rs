//! Trade log entries and equity-curve points.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Label of the fill booked when a position is still open after the last candle.
pub const SQUAREOFF_END: &str = "SQUAREOFF_END";

/// One accepted fill. The log is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    /// `"BUY"`, `"SELL"` or `"SQUAREOFF_END"`.
    pub action: String,
    pub timestamp: DateTime<FixedOffset>,
    pub quantity: u64,
    pub price: f64,
    /// `quantity * price`, before charges.
    pub value: f64,
    pub charges: f64,
}

impl TradeLogEntry {
    pub fn new(
        action: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
        quantity: u64,
        price: f64,
        charges: f64,
    ) -> Self {
        Self {
            action: action.into(),
            timestamp,
            quantity,
            price,
            value: quantity as f64 * price,
            charges,
        }
    }

    pub fn is_entry(&self) -> bool {
        self.action == "BUY"
    }

    /// SELL and forced square-off both close the position.
    pub fn is_exit(&self) -> bool {
        self.action == "SELL" || self.action == SQUAREOFF_END
    }
}

/// Mark-to-market portfolio value after a candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub value: f64,
}
