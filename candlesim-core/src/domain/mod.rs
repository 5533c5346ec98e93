//! Domain types: candles, actions, order vocabulary, trade log.

pub mod action;
pub mod candle;
pub mod order;
pub mod trade;

pub use action::{Action, ActionKind};
pub use candle::{candles_from_rows, Candle, CandleError};
pub use order::{Exchange, OrderDetails, ProductClass, ProductType, Side};
pub use trade::{EquityPoint, TradeLogEntry, SQUAREOFF_END};
