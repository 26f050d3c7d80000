//! Circuit breakers (spec §4.5): per-underlying flash-crash detection and
//! an API-failure streak that pauses trading until it recovers.

use std::collections::VecDeque;

use crate::config::RiskConfig;

/// Ring of (monotonic_millis, price) samples bounded to the flash-crash
/// detection window; oldest samples fall off as new ones arrive.
#[derive(Debug, Default)]
pub struct FlashCrashDetector {
    samples: VecDeque<(u64, f64)>,
}

impl FlashCrashDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a price sample and reports whether the move across the
    /// configured window now exceeds `flash_crash_move_pct`.
    pub fn on_price(&mut self, cfg: &RiskConfig, now_millis: u64, price: f64) -> bool {
        self.samples.push_back((now_millis, price));
        let window_start = now_millis.saturating_sub(cfg.flash_crash_window_secs * 1000);
        while self.samples.front().is_some_and(|(t, _)| *t < window_start) {
            self.samples.pop_front();
        }
        let Some(&(_, oldest_price)) = self.samples.front() else { return false };
        if oldest_price <= 0.0 {
            return false;
        }
        ((price - oldest_price).abs() / oldest_price) >= cfg.flash_crash_move_pct
    }
}

#[derive(Debug, Default)]
pub struct ApiFailureStreak {
    consecutive_failures: u32,
}

impl ApiFailureStreak {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the streak reaches the configured pause threshold.
    pub fn record(&mut self, cfg: &RiskConfig, success: bool) -> bool {
        if success {
            self.consecutive_failures = 0;
            false
        } else {
            self.consecutive_failures += 1;
            self.consecutive_failures >= cfg.api_failure_streak_threshold
        }
    }
}
