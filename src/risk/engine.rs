//! Risk & safety layer (spec §4.5): single authority over capacity,
//! cooldowns, sizing, and the kill switch. Owned by one writer task; reached
//! only via its methods (spec §5: "all mutations via messages").

use crate::config::RiskConfig;
use crate::model::MarketRegime;

use super::capacity::{check_capacity, CapacityBlock, CapacityInputs};
use super::circuit_breaker::{ApiFailureStreak, FlashCrashDetector};
use super::cooldown::cooldown_secs_after_close;
use super::freshness::{FreshnessMonitor, FreshnessStatus};
use super::kill_switch::KillSwitch;
use super::sizing::{size_by_volatility, KellyInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBlock {
    KillSwitch,
    DataStale,
    CircuitPaused,
    Capacity(CapacityBlock),
}

pub struct RiskEngine {
    cfg: RiskConfig,
    daily_realized_pnl: f64,
    consecutive_losses: u32,
    open_positions: usize,
    cooldown_until_millis: Option<u64>,
    circuit_pause_until_millis: Option<u64>,
    freshness: FreshnessMonitor,
    flash_crash: FlashCrashDetector,
    api_failures: ApiFailureStreak,
    kill_switch: KillSwitch,
}

impl RiskEngine {
    pub fn new(cfg: RiskConfig, now_millis: u64) -> Self {
        Self {
            freshness: FreshnessMonitor::new(now_millis),
            flash_crash: FlashCrashDetector::new(),
            api_failures: ApiFailureStreak::new(),
            kill_switch: KillSwitch::new(),
            cfg,
            daily_realized_pnl: 0.0,
            consecutive_losses: 0,
            open_positions: 0,
            cooldown_until_millis: None,
            circuit_pause_until_millis: None,
        }
    }

    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill_switch
    }

    pub fn can_enter(&self, now_millis: u64, available_margin: f64, required_margin: f64) -> Result<(), RiskBlock> {
        if self.kill_switch.is_set() {
            return Err(RiskBlock::KillSwitch);
        }
        if self.freshness.status(&self.cfg, now_millis) != FreshnessStatus::Fresh {
            return Err(RiskBlock::DataStale);
        }
        if self.circuit_pause_until_millis.is_some_and(|until| now_millis < until) {
            return Err(RiskBlock::CircuitPaused);
        }
        check_capacity(
            &self.cfg,
            &CapacityInputs {
                daily_realized_pnl: self.daily_realized_pnl,
                consecutive_losses: self.consecutive_losses,
                in_cooldown: self.cooldown_until_millis.is_some_and(|until| now_millis < until),
                open_positions: self.open_positions,
                available_margin,
                required_margin,
            },
        )
        .map_err(RiskBlock::Capacity)
    }

    pub fn on_trade_opened(&mut self) {
        self.open_positions += 1;
    }

    pub fn on_trade_closed(&mut self, pnl: f64, now_millis: u64, regime: MarketRegime) {
        self.open_positions = self.open_positions.saturating_sub(1);
        self.daily_realized_pnl += pnl;
        let was_win = pnl > 0.0;
        self.consecutive_losses = if was_win { 0 } else { self.consecutive_losses + 1 };
        let cooldown_secs = cooldown_secs_after_close(&self.cfg, was_win, self.consecutive_losses, regime);
        self.cooldown_until_millis = Some(now_millis + cooldown_secs * 1000);
    }

    pub fn reset_daily(&mut self) {
        self.daily_realized_pnl = 0.0;
        self.consecutive_losses = 0;
    }

    pub fn on_valid_snapshot(&mut self, now_millis: u64) {
        self.freshness.on_valid_snapshot(now_millis);
    }

    pub fn freshness_status(&self, now_millis: u64) -> FreshnessStatus {
        self.freshness.status(&self.cfg, now_millis)
    }

    /// Feeds a price sample to the flash-crash detector; if it trips,
    /// schedules the configured pause and returns true.
    pub fn on_price(&mut self, now_millis: u64, price: f64) -> bool {
        if self.flash_crash.on_price(&self.cfg, now_millis, price) {
            self.circuit_pause_until_millis = Some(now_millis + self.cfg.flash_crash_pause_secs * 1000);
            true
        } else {
            false
        }
    }

    /// Feeds an API call result to the failure-streak breaker; if it trips,
    /// schedules the same pause as a flash crash.
    pub fn on_api_result(&mut self, now_millis: u64, success: bool) -> bool {
        if self.api_failures.record(&self.cfg, success) {
            self.circuit_pause_until_millis = Some(now_millis + self.cfg.flash_crash_pause_secs * 1000);
            true
        } else {
            false
        }
    }

    pub fn size_for_entry(&self, iv: f64) -> u64 {
        size_by_volatility(&self.cfg, iv)
    }

    pub fn size_for_entry_kelly(&self, kelly: &KellyInputs, bankroll_units: f64) -> u64 {
        super::sizing::size_by_kelly(&self.cfg, kelly, bankroll_units)
    }
}
