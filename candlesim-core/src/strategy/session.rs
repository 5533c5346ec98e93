//! Exchange trading session and the open/close avoidance window.

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// Regular session in exchange-local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingSession {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for TradingSession {
    /// NSE/BSE cash session, 09:15–15:30.
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
        }
    }
}

impl TradingSession {
    /// True when the candle's local time is before `open + open_avoid` or
    /// strictly after `close - close_avoid`.
    ///
    /// A window too large for a `Duration` never matches.
    pub fn is_near_open_or_close(
        &self,
        candle: &Candle,
        open_avoid_minutes: i64,
        close_avoid_minutes: i64,
    ) -> bool {
        let (Some(open_avoid), Some(close_avoid)) = (
            Duration::try_minutes(open_avoid_minutes),
            Duration::try_minutes(close_avoid_minutes),
        ) else {
            return false;
        };
        let local = candle.timestamp.time();
        // drop sub-second precision so boundaries compare on whole seconds
        let local = local.with_nanosecond(0).unwrap_or(local);
        let avoid_open_until = self.open + open_avoid;
        let avoid_close_from = self.close - close_avoid;
        local < avoid_open_until || local > avoid_close_from
    }
}
