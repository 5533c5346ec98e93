//! Order vocabulary shared by strategies, the fee model, and the engine.
//!
//! Wire values (product type, exchange) stay as the broker spells them on
//! `OrderDetails`; the fee model parses them into `ProductType`/`Exchange`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ORDER_TYPE_MARKET: &str = "MARKET";
pub const VARIETY_NORMAL: &str = "NORMAL";
pub const DURATION_DAY: &str = "DAY";
pub const PRODUCT_INTRADAY: &str = "INTRADAY";
pub const EXCHANGE_NSE: &str = "NSE";

/// Direction of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Broker product type, parsed case-insensitively.
///
/// Anything unrecognized is kept verbatim in `Unknown` so the fee model can
/// log it and fall back to its conservative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    Delivery,
    Intraday,
    Margin,
    Bracket,
    Cover,
    CarryForward,
    Fno,
    FnoFutures,
    FnoOptions,
    Unknown(String),
}

/// Rate-table class a product type falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductClass {
    Delivery,
    /// Intraday, margin, bracket and cover orders.
    Intraday,
    /// Carry-forward, generic F&O and futures legs.
    Futures,
    Options,
    Unknown,
}

impl ProductType {
    pub fn class(&self) -> ProductClass {
        match self {
            ProductType::Delivery => ProductClass::Delivery,
            ProductType::Intraday
            | ProductType::Margin
            | ProductType::Bracket
            | ProductType::Cover => ProductClass::Intraday,
            ProductType::CarryForward | ProductType::Fno | ProductType::FnoFutures => {
                ProductClass::Futures
            }
            ProductType::FnoOptions => ProductClass::Options,
            ProductType::Unknown(_) => ProductClass::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProductType::Delivery => "DELIVERY",
            ProductType::Intraday => "INTRADAY",
            ProductType::Margin => "MARGIN",
            ProductType::Bracket => "BO",
            ProductType::Cover => "CO",
            ProductType::CarryForward => "CARRYFORWARD",
            ProductType::Fno => "FNO",
            ProductType::FnoFutures => "FNO_FUT",
            ProductType::FnoOptions => "FNO_OPT",
            ProductType::Unknown(raw) => raw,
        }
    }
}

impl FromStr for ProductType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let product = match s.trim().to_ascii_uppercase().as_str() {
            "DELIVERY" => ProductType::Delivery,
            "INTRADAY" => ProductType::Intraday,
            "MARGIN" => ProductType::Margin,
            "BO" => ProductType::Bracket,
            "CO" => ProductType::Cover,
            "CARRYFORWARD" => ProductType::CarryForward,
            "FNO" => ProductType::Fno,
            "FNO_FUT" => ProductType::FnoFutures,
            "FNO_OPT" => ProductType::FnoOptions,
            _ => ProductType::Unknown(s.to_string()),
        };
        Ok(product)
    }
}

impl From<&str> for ProductType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(product) => product,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange a fill is routed to. Only NSE and BSE have exchange charge tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Nse,
    Bse,
    Other(String),
}

impl From<&str> for Exchange {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "NSE" => Exchange::Nse,
            "BSE" => Exchange::Bse,
            _ => Exchange::Other(s.to_string()),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Nse => f.write_str("NSE"),
            Exchange::Bse => f.write_str("BSE"),
            Exchange::Other(raw) => f.write_str(raw),
        }
    }
}

/// Order metadata a strategy attaches to BUY/SELL actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub symbol_token: String,
    pub trading_symbol: String,
    pub exchange: String,
    pub order_type: String,
    pub product_type: String,
    pub variety: String,
    pub duration: String,
    pub trigger_price: f64,
}

impl OrderDetails {
    /// Plain market order for the day, the only kind the bundled strategies emit.
    pub fn market(
        symbol_token: impl Into<String>,
        trading_symbol: impl Into<String>,
        exchange: impl Into<String>,
        product_type: impl Into<String>,
    ) -> Self {
        Self {
            symbol_token: symbol_token.into(),
            trading_symbol: trading_symbol.into(),
            exchange: exchange.into(),
            order_type: ORDER_TYPE_MARKET.to_string(),
            product_type: product_type.into(),
            variety: VARIETY_NORMAL.to_string(),
            duration: DURATION_DAY.to_string(),
            trigger_price: 0.0,
        }
    }

    pub fn product(&self) -> ProductType {
        ProductType::from(self.product_type.as_str())
    }

    pub fn exchange(&self) -> Exchange {
        Exchange::from(self.exchange.as_str())
    }
}
