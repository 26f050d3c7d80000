//! Tick (spec §3): timestamp, LTP, bid/ask + sizes, volume, OI.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single market-data update for one instrument. Timestamps are
/// monotonically non-decreasing per instrument (spec §5 ordering guarantees);
/// the feed adapter is responsible for dropping or logging any violation
/// before it reaches the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Milliseconds since an arbitrary epoch fixed for the process lifetime;
    /// monotonic, used for age/ordering checks.
    pub monotonic_millis: u64,
    /// Wall-clock time, UTC, used only for display/journaling.
    pub wall_millis_utc: i64,
    pub ltp: f64,
    pub bid: f64,
    pub ask: f64,
    pub bid_size: u64,
    pub ask_size: u64,
    pub volume: u64,
    pub open_interest: u64,
}

impl Tick {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread_pct_of_mid(&self) -> f64 {
        let mid = self.mid();
        if mid <= 0.0 {
            return f64::INFINITY;
        }
        (self.ask - self.bid) / mid
    }

    pub fn age(&self, now_monotonic_millis: u64) -> Duration {
        Duration::from_millis(now_monotonic_millis.saturating_sub(self.monotonic_millis))
    }
}
