//! StrategyParams: flat string-keyed strategy configuration.
//!
//! Values are JSON scalars. Typed getters fall back to the caller's default
//! when a key is absent, and also (with a warning) when it has the wrong type.

use crate::domain::order::{EXCHANGE_NSE, PRODUCT_INTRADAY};
use crate::domain::OrderDetails;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyParams {
    values: BTreeMap<String, Value>,
}

impl StrategyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Integer value. Fractional numbers truncate; numeric strings are accepted.
    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            None | Some(Value::Null) => default,
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .unwrap_or(default),
            Some(Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => f.trunc() as i64,
                _ => wrong_type(key, "integer", default),
            },
            Some(_) => wrong_type(key, "integer", default),
        }
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.values.get(key) {
            None | Some(Value::Null) => default,
            Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
            Some(Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => f,
                _ => wrong_type(key, "number", default),
            },
            Some(_) => wrong_type(key, "number", default),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            None | Some(Value::Null) => default,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
            Some(_) => wrong_type(key, "boolean", default),
        }
    }

    /// String value; numbers and booleans are rendered as text.
    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            None | Some(Value::Null) => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
            Some(_) => wrong_type(key, "string", default.to_string()),
        }
    }
}

fn wrong_type<T: std::fmt::Debug>(key: &str, expected: &str, default: T) -> T {
    warn!(key, expected, ?default, "strategy parameter has wrong type, using default");
    default
}

impl From<BTreeMap<String, Value>> for StrategyParams {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self::from_map(values)
    }
}

/// Order keys every strategy reads.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSettings {
    pub symbol_token: String,
    pub trading_symbol: String,
    pub exchange: String,
    pub product_type: String,
    pub quantity: u64,
}

impl OrderSettings {
    pub const DEFAULT_SYMBOL_TOKEN: &'static str = "UNKNOWN";

    pub fn from_params(params: &StrategyParams) -> Self {
        let symbol_token = params.get_str("symbolToken", Self::DEFAULT_SYMBOL_TOKEN);
        let trading_symbol = params.get_str("tradingSymbol", &symbol_token);
        let quantity = params.get_i64("quantity", 1).max(0) as u64;
        Self {
            trading_symbol,
            exchange: params.get_str("exchange", EXCHANGE_NSE),
            product_type: params.get_str("productType", PRODUCT_INTRADAY),
            quantity,
            symbol_token,
        }
    }

    pub fn order_details(&self) -> OrderDetails {
        OrderDetails::market(
            self.symbol_token.clone(),
            self.trading_symbol.clone(),
            self.exchange.clone(),
            self.product_type.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_getters_with_defaults() {
        let params = StrategyParams::new()
            .with("shortPeriod", 3)
            .with("stopLossPercent", 0.5)
            .with("avoidMarketOpenClose", false)
            .with("exchange", "BSE");
        assert_eq!(params.get_i64("shortPeriod", 10), 3);
        assert_eq!(params.get_i64("longPeriod", 50), 50);
        assert_eq!(params.get_f64("stopLossPercent", 0.4), 0.5);
        assert!(!params.get_bool("avoidMarketOpenClose", true));
        assert_eq!(params.get_str("exchange", "NSE"), "BSE");
    }

    #[test]
    fn lenient_numeric_coercion() {
        let params = StrategyParams::new()
            .with("rsiPeriod", "21")
            .with("minCandlesBetweenTrades", 7.9)
            .with("oversoldThreshold", 30)
            .with("symbolToken", 3045);
        assert_eq!(params.get_i64("rsiPeriod", 14), 21);
        assert_eq!(params.get_i64("minCandlesBetweenTrades", 10), 7);
        assert_eq!(params.get_f64("oversoldThreshold", 25.0), 30.0);
        assert_eq!(params.get_str("symbolToken", "UNKNOWN"), "3045");
    }

    #[test]
    fn wrong_type_falls_back() {
        let params = StrategyParams::new()
            .with("shortPeriod", json!([1, 2]))
            .with("avoidMarketOpenClose", 1)
            .with("stopLossPercent", "lots");
        assert_eq!(params.get_i64("shortPeriod", 10), 10);
        assert!(params.get_bool("avoidMarketOpenClose", true));
        assert_eq!(params.get_f64("stopLossPercent", 0.4), 0.4);
    }

    #[test]
    fn order_settings_defaults() {
        let settings = OrderSettings::from_params(&StrategyParams::new());
        assert_eq!(settings.symbol_token, "UNKNOWN");
        assert_eq!(settings.trading_symbol, "UNKNOWN");
        assert_eq!(settings.exchange, "NSE");
        assert_eq!(settings.product_type, "INTRADAY");
        assert_eq!(settings.quantity, 1);
    }

    #[test]
    fn trading_symbol_defaults_to_token() {
        let params = StrategyParams::new().with("symbolToken", "3045");
        let settings = OrderSettings::from_params(&params);
        assert_eq!(settings.trading_symbol, "3045");
        let details = settings.order_details();
        assert_eq!(details.order_type, "MARKET");
        assert_eq!(details.product_type, "INTRADAY");
    }

    #[test]
    fn deserializes_from_flat_json() {
        let params: StrategyParams =
            serde_json::from_str(r#"{"shortPeriod": 3, "longPeriod": 5}"#).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get_i64("longPeriod", 50), 5);
    }
}
