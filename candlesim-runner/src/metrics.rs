//! Performance metrics: pure functions over a report's trade log and equity curve.
//!
//! No dependencies on the runner, data loading, or engine internals.

use serde::{Deserialize, Serialize};

use candlesim_core::domain::TradeLogEntry;
use candlesim_core::engine::Report;

/// Aggregate statistics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub net_profit: f64,
    pub profit_percentage: f64,
    pub round_trips: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_trade_pnl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    /// `None` when there are no losing trades.
    pub profit_factor: Option<f64>,
    pub total_charges: f64,
    /// Largest peak-to-trough decline as a fraction of the peak (≤ 0).
    pub max_drawdown: f64,
    pub forced_square_off: bool,
}

/// One entry paired with its exit, net of both legs' charges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: u64,
    pub charges: f64,
    pub pnl: f64,
}

impl PerformanceMetrics {
    pub fn compute(report: &Report) -> Self {
        let trips = round_trips(&report.trades);
        let pnls: Vec<f64> = trips.iter().map(|t| t.pnl).collect();
        let equity = report.equity_values();

        Self {
            net_profit: report.net_profit,
            profit_percentage: report.profit_percentage,
            round_trips: trips.len(),
            winning_trades: pnls.iter().filter(|&&p| p > 0.0).count(),
            losing_trades: pnls.iter().filter(|&&p| p < 0.0).count(),
            win_rate: win_rate(&pnls),
            avg_trade_pnl: mean(&pnls),
            best_trade: pnls.iter().copied().fold(0.0, f64::max),
            worst_trade: pnls.iter().copied().fold(0.0, f64::min),
            profit_factor: profit_factor(&pnls),
            total_charges: report.total_charges(),
            max_drawdown: max_drawdown(&equity),
            forced_square_off: report.diagnostics.forced_square_off,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Pair each BUY with the next exit (SELL or end-of-data square-off).
/// A trailing unmatched BUY is ignored.
pub fn round_trips(trades: &[TradeLogEntry]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<&TradeLogEntry> = None;
    for trade in trades {
        if trade.is_entry() {
            open = Some(trade);
        } else if trade.is_exit() {
            if let Some(entry) = open.take() {
                let charges = entry.charges + trade.charges;
                trips.push(RoundTrip {
                    entry_price: entry.price,
                    exit_price: trade.price,
                    quantity: trade.quantity,
                    charges,
                    pnl: trade.value - entry.value - charges,
                });
            }
        }
    }
    trips
}

/// Fraction of round trips with positive P&L. 0.0 with no trips.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|&&p| p > 0.0).count() as f64 / pnls.len() as f64
}

/// Gross profit / gross loss; undefined without losses.
pub fn profit_factor(pnls: &[f64]) -> Option<f64> {
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
    if gross_loss < 1e-15 {
        return None;
    }
    Some(gross_profit / gross_loss)
}

/// Maximum drawdown as a negative fraction of the running peak.
///
/// Returns 0.0 for monotonically non-decreasing equity or a non-positive peak.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in equity_curve {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.min((value - peak) / peak);
        }
    }
    worst
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
