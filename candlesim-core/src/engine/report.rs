//! Report: immutable result of one simulation run.

use crate::domain::{Candle, EquityPoint, TradeLogEntry};
use serde::{Deserialize, Serialize};

/// Counters that make ledger refusals and unmatched signals visible.
///
/// `signals_received == signals_applied + rejected_* + unmatched_signals`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDiagnostics {
    pub signals_received: usize,
    pub signals_applied: usize,
    pub rejected_insufficient_cash: usize,
    pub rejected_wrong_state: usize,
    pub rejected_invalid_order: usize,
    /// Signals whose timestamp never lined up with a candle.
    pub unmatched_signals: usize,
    pub forced_square_off: bool,
}

impl ReplayDiagnostics {
    pub fn rejected(&self) -> usize {
        self.rejected_insufficient_cash + self.rejected_wrong_state + self.rejected_invalid_order
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub strategy: String,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub net_profit: f64,
    /// Zero when `initial_capital` is zero.
    pub profit_percentage: f64,
    pub total_trades: usize,
    pub trades: Vec<TradeLogEntry>,
    pub equity_curve: Vec<EquityPoint>,
    pub source_candles: Vec<Candle>,
    pub diagnostics: ReplayDiagnostics,
}

impl Report {
    /// Deterministic JSON: field order is fixed by the struct definitions.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// blake3 hex digest of [`Report::to_json`]; equal reports hash equal.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = self.to_json()?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn total_charges(&self) -> f64 {
        self.trades.iter().map(|t| t.charges).sum()
    }

    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.value).collect()
    }
}

pub(crate) fn profit_percentage(initial_capital: f64, final_capital: f64) -> f64 {
    if initial_capital == 0.0 {
        0.0
    } else {
        (final_capital - initial_capital) / initial_capital * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profit_percentage_guard() {
        assert_eq!(profit_percentage(0.0, 500.0), 0.0);
        assert_eq!(profit_percentage(1000.0, 1100.0), 10.0);
        assert_eq!(profit_percentage(1000.0, 900.0), -10.0);
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let report = Report {
            strategy: "MA Crossover".into(),
            initial_capital: 1000.0,
            final_capital: 1000.0,
            net_profit: 0.0,
            profit_percentage: 0.0,
            total_trades: 0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            source_candles: Vec::new(),
            diagnostics: ReplayDiagnostics::default(),
        };
        let a = report.fingerprint().unwrap();
        assert_eq!(a, report.clone().fingerprint().unwrap());
        assert_eq!(a.len(), 64);

        let mut other = report;
        other.final_capital = 1000.5;
        assert_ne!(a, other.fingerprint().unwrap());
    }
}
