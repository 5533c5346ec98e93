//! Backtesting engine: signal replay, ledger accounting and fees.
//!
//! A run replays a strategy's time-ordered signal stream candle by candle:
//!
//! 1. Match the next pending signal to the candle by exact timestamp
//! 2. Book the fill through the [`Ledger`] with charges from the [`FeeModel`]
//! 3. Mark the ledger to market at the candle's close
//!
//! Any position still open after the last candle is squared off.

pub mod fee_model;
pub mod ledger;
pub mod report;
pub mod simulation;
pub mod state;

pub use fee_model::{ChargeBreakdown, FeeModel, FeeRates};
pub use ledger::{ClosedPosition, Ledger, LedgerRejection};
pub use report::{ReplayDiagnostics, Report};
pub use simulation::{run_backtest, SimulationEngine};
pub use state::{RunConfig, DEFAULT_INITIAL_CAPITAL, DEFAULT_SHARES_PER_TRADE};
