//! Fee model: per-leg Indian equity/derivative transaction charges.
//!
//! All rates are fractions of turnover (`price * quantity`) except the flat
//! brokerage amounts. No rounding is applied; callers round for display.

use crate::domain::{Exchange, ProductClass, ProductType, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Rate table. `Default` is the discount-broker schedule the simulator ships with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRates {
    pub intraday_brokerage_rate: f64,
    pub brokerage_cap: f64,
    pub flat_brokerage: f64,

    pub stt_delivery: f64,
    pub stt_intraday_sell: f64,
    pub stt_futures_sell: f64,
    pub stt_options_sell: f64,

    pub txn_equity: f64,
    pub txn_futures_nse: f64,
    pub txn_options_nse: f64,

    pub gst: f64,
    pub sebi: f64,

    pub stamp_delivery: f64,
    pub stamp_intraday: f64,
    pub stamp_futures: f64,
    pub stamp_options: f64,
}

impl Default for FeeRates {
    fn default() -> Self {
        Self {
            intraday_brokerage_rate: 0.0003,
            brokerage_cap: 20.0,
            flat_brokerage: 20.0,

            stt_delivery: 0.001,
            stt_intraday_sell: 0.00025,
            stt_futures_sell: 0.000125,
            stt_options_sell: 0.0005,

            txn_equity: 0.0000345,
            txn_futures_nse: 0.000018,
            txn_options_nse: 0.00053,

            gst: 0.18,
            sebi: 0.000001,

            stamp_delivery: 0.00015,
            stamp_intraday: 0.00003,
            stamp_futures: 0.00002,
            stamp_options: 0.00003,
        }
    }
}

/// Per-component charges for one fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    pub turnover: f64,
    pub brokerage: f64,
    pub stt: f64,
    pub transaction_charges: f64,
    pub gst: f64,
    pub sebi_fees: f64,
    pub stamp_duty: f64,
}

impl ChargeBreakdown {
    pub fn total(&self) -> f64 {
        self.brokerage
            + self.stt
            + self.transaction_charges
            + self.gst
            + self.sebi_fees
            + self.stamp_duty
    }
}

/// Pure charge calculator. Holds only its rate table, so it is freely shareable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeModel {
    rates: FeeRates,
}

impl FeeModel {
    pub fn new(rates: FeeRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &FeeRates {
        &self.rates
    }

    /// Total charges for one leg. Zero when price or quantity is non-positive.
    pub fn total_charges(
        &self,
        price: f64,
        quantity: i64,
        side: Side,
        product_type: &ProductType,
        exchange: &Exchange,
    ) -> f64 {
        self.breakdown(price, quantity, side, product_type, exchange)
            .total()
    }

    pub fn breakdown(
        &self,
        price: f64,
        quantity: i64,
        side: Side,
        product_type: &ProductType,
        exchange: &Exchange,
    ) -> ChargeBreakdown {
        if price <= 0.0 || quantity <= 0 || price.is_nan() {
            return ChargeBreakdown::default();
        }

        let r = &self.rates;
        let class = product_type.class();
        let turnover = price * quantity as f64;

        let brokerage = match class {
            ProductClass::Delivery => 0.0,
            ProductClass::Intraday => (r.intraday_brokerage_rate * turnover).min(r.brokerage_cap),
            ProductClass::Futures | ProductClass::Options => r.flat_brokerage,
            ProductClass::Unknown => {
                warn!(product_type = %product_type, "unknown product type, using flat brokerage");
                r.flat_brokerage
            }
        };

        let stt_rate = match (class, side) {
            (ProductClass::Delivery, _) => r.stt_delivery,
            (ProductClass::Intraday, Side::Sell) => r.stt_intraday_sell,
            (ProductClass::Futures, Side::Sell) => r.stt_futures_sell,
            (ProductClass::Options, Side::Sell) => r.stt_options_sell,
            _ => 0.0,
        };

        let txn_rate = match (exchange, class) {
            (Exchange::Nse | Exchange::Bse, ProductClass::Delivery | ProductClass::Intraday) => {
                r.txn_equity
            }
            (Exchange::Nse, ProductClass::Futures) => r.txn_futures_nse,
            (Exchange::Nse, ProductClass::Options) => r.txn_options_nse,
            _ => 0.0,
        };

        let stamp_rate = match (side, class) {
            (Side::Buy, ProductClass::Delivery) => r.stamp_delivery,
            (Side::Buy, ProductClass::Intraday) => r.stamp_intraday,
            (Side::Buy, ProductClass::Futures) => r.stamp_futures,
            (Side::Buy, ProductClass::Options) => r.stamp_options,
            _ => 0.0,
        };

        let transaction_charges = txn_rate * turnover;
        let breakdown = ChargeBreakdown {
            turnover,
            brokerage,
            stt: stt_rate * turnover,
            transaction_charges,
            gst: r.gst * (brokerage + transaction_charges),
            sebi_fees: r.sebi * turnover,
            stamp_duty: stamp_rate * turnover,
        };

        debug!(
            %side,
            product_type = %product_type,
            %exchange,
            quantity,
            price,
            turnover,
            brokerage = breakdown.brokerage,
            stt = breakdown.stt,
            txn = breakdown.transaction_charges,
            gst = breakdown.gst,
            sebi = breakdown.sebi_fees,
            stamp = breakdown.stamp_duty,
            total = breakdown.total(),
            "charges computed"
        );

        breakdown
    }
}
