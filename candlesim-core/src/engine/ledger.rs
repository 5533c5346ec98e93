//! Ledger: the engine's single-instrument cash and position book.
//!
//! The ledger is the sole authority on fills: a strategy's view of its own
//! position is advisory only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a fill was refused. Refusals are not errors for the run as a whole.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerRejection {
    #[error("buy while already long")]
    AlreadyLong,

    #[error("sell while flat")]
    NotLong,

    #[error("insufficient cash: need {required:.2}, have {available:.2}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("invalid order: price {price}, quantity {quantity}")]
    InvalidOrder { price: f64, quantity: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    cash: f64,
    shares_held: u64,
    entry_price: f64,
}

/// Result of closing a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedPosition {
    pub quantity: u64,
    pub entry_price: f64,
}

impl Ledger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            shares_held: 0,
            entry_price: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn shares_held(&self) -> u64 {
        self.shares_held
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn is_flat(&self) -> bool {
        self.shares_held == 0
    }

    /// Open a long position. Debits `quantity * price + charges` only if the
    /// ledger is flat and cash covers the full amount.
    pub fn apply_buy(
        &mut self,
        price: f64,
        quantity: u64,
        charges: f64,
    ) -> Result<(), LedgerRejection> {
        if !self.is_flat() {
            return Err(LedgerRejection::AlreadyLong);
        }
        if !(price > 0.0) || quantity == 0 {
            return Err(LedgerRejection::InvalidOrder { price, quantity });
        }
        let required = quantity as f64 * price + charges;
        if self.cash < required {
            return Err(LedgerRejection::InsufficientCash {
                required,
                available: self.cash,
            });
        }

        self.cash -= required;
        self.shares_held = quantity;
        self.entry_price = price;
        Ok(())
    }

    /// Close the whole position at `price`, crediting `held * price - charges`.
    pub fn apply_sell(&mut self, price: f64, charges: f64) -> Result<ClosedPosition, LedgerRejection> {
        if self.is_flat() {
            return Err(LedgerRejection::NotLong);
        }
        let closed = ClosedPosition {
            quantity: self.shares_held,
            entry_price: self.entry_price,
        };

        self.cash += closed.quantity as f64 * price - charges;
        self.shares_held = 0;
        self.entry_price = 0.0;
        Ok(closed)
    }

    /// Cash plus the position valued at `close`.
    pub fn mark_to_market(&self, close: f64) -> f64 {
        self.cash + self.shares_held as f64 * close
    }

    /// `shares_held == 0 ⇔ entry_price == 0`, and a long position has a positive entry.
    pub fn invariants_hold(&self) -> bool {
        let flat_consistent = (self.shares_held == 0) == (self.entry_price == 0.0);
        let long_consistent = self.shares_held == 0 || self.entry_price > 0.0;
        flat_consistent && long_consistent
    }
}
