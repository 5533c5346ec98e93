//! Action: a strategy's decision at one candle.

use super::order::{OrderDetails, Side};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Hold,
    Buy,
    Sell,
}

impl ActionKind {
    /// Fill side for tradable kinds; `None` for HOLD.
    pub fn side(self) -> Option<Side> {
        match self {
            ActionKind::Hold => None,
            ActionKind::Buy => Some(Side::Buy),
            ActionKind::Sell => Some(Side::Sell),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Hold => f.write_str("HOLD"),
            ActionKind::Buy => f.write_str("BUY"),
            ActionKind::Sell => f.write_str("SELL"),
        }
    }
}

/// One tagged decision. HOLD carries zero price/quantity and no order details;
/// BUY and SELL always carry order details.
///
/// Created by a strategy, consumed once by the engine, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub timestamp: DateTime<FixedOffset>,
    pub kind: ActionKind,
    pub price: f64,
    pub quantity: u64,
    pub order: Option<OrderDetails>,
    /// Label of the condition that fired, e.g. `"OVERBOUGHT"`.
    pub reason: Option<String>,
}

impl Action {
    pub fn hold(timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp,
            kind: ActionKind::Hold,
            price: 0.0,
            quantity: 0,
            order: None,
            reason: None,
        }
    }

    pub fn buy(
        timestamp: DateTime<FixedOffset>,
        price: f64,
        quantity: u64,
        order: OrderDetails,
    ) -> Self {
        Self::trade(timestamp, ActionKind::Buy, price, quantity, order)
    }

    pub fn sell(
        timestamp: DateTime<FixedOffset>,
        price: f64,
        quantity: u64,
        order: OrderDetails,
    ) -> Self {
        Self::trade(timestamp, ActionKind::Sell, price, quantity, order)
    }

    fn trade(
        timestamp: DateTime<FixedOffset>,
        kind: ActionKind,
        price: f64,
        quantity: u64,
        order: OrderDetails,
    ) -> Self {
        Self {
            timestamp,
            kind,
            price,
            quantity,
            order: Some(order),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_hold(&self) -> bool {
        self.kind == ActionKind::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-15T10:00:00+05:30").unwrap()
    }

    #[test]
    fn hold_has_no_order_fields() {
        let hold = Action::hold(ts());
        assert!(hold.is_hold());
        assert_eq!(hold.price, 0.0);
        assert_eq!(hold.quantity, 0);
        assert!(hold.order.is_none());
        assert_eq!(hold.kind.side(), None);
    }

    #[test]
    fn buy_carries_details_and_reason() {
        let details = OrderDetails::market("3045", "SBIN-EQ", "NSE", "INTRADAY");
        let buy = Action::buy(ts(), 612.5, 5, details.clone()).with_reason("OVERSOLD_RECOVERY");
        assert_eq!(buy.kind, ActionKind::Buy);
        assert_eq!(buy.kind.side(), Some(Side::Buy));
        assert_eq!(buy.order, Some(details));
        assert_eq!(buy.reason.as_deref(), Some("OVERSOLD_RECOVERY"));
        assert_eq!(buy.kind.to_string(), "BUY");
    }
}
