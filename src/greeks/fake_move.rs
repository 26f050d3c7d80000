//! Fake-move / smart-money filter and the theta-trap advisory (spec §4.1).

use crate::config::GreeksConfig;
use crate::model::{GreeksDelta, InstrumentId};
use rustc_hash::FxHashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowSignal {
    SmartMoney,
    FakeMove,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowClassification {
    pub signal: FlowSignal,
    pub quality: f64,
    pub theta_trap: bool,
}

/// Classifies one instrument's delta/OI co-movement per spec §4.1:
/// `delta_delta > threshold` combined with `oi_delta > 0` is smart money
/// (quality 0.9); combined with `oi_delta < 0` is a fake move (quality 0.1),
/// and locks entries on that strike.
pub fn classify_flow(cfg: &GreeksConfig, delta: &GreeksDelta, oi_delta: i64) -> FlowClassification {
    let theta_trap = delta.elapsed_millis > 0
        && delta.elapsed_millis <= cfg.theta_trap_window_secs * 1000
        && delta.delta_theta.abs() > cfg.theta_trap_accel_pct * 1.0; // theta worsened by > configured fraction

    if delta.delta_delta > cfg.fake_move_delta_threshold {
        if oi_delta > 0 {
            return FlowClassification { signal: FlowSignal::SmartMoney, quality: 0.9, theta_trap };
        } else if oi_delta < 0 {
            return FlowClassification { signal: FlowSignal::FakeMove, quality: 0.1, theta_trap };
        }
    }
    FlowClassification { signal: FlowSignal::Neutral, quality: 0.5, theta_trap }
}

/// Tracks active fake-move locks: an instrument flagged `FakeMove` blocks
/// entries on that strike for `fake_move_lock_secs`.
#[derive(Debug, Default)]
pub struct FakeMoveLocks {
    locked_until: FxHashMap<InstrumentId, Instant>,
}

impl FakeMoveLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engage(&mut self, instrument: InstrumentId, now: Instant, duration_secs: u64) {
        self.locked_until.insert(instrument, now + std::time::Duration::from_secs(duration_secs));
    }

    pub fn is_locked(&self, instrument: InstrumentId, now: Instant) -> bool {
        self.locked_until.get(&instrument).is_some_and(|until| now < *until)
    }

    pub fn is_any_locked(&self, now: Instant) -> bool {
        self.locked_until.values().any(|until| now < *until)
    }

    pub fn sweep_expired(&mut self, now: Instant) {
        self.locked_until.retain(|_, until| now < *until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn delta(dd: f64, dt: f64, elapsed_ms: u64) -> GreeksDelta {
        GreeksDelta { delta_delta: dd, delta_gamma: 0.0, delta_theta: dt, delta_vega: 0.0, elapsed_millis: elapsed_ms }
    }

    #[test]
    fn rising_delta_with_rising_oi_is_smart_money() {
        let cfg = GreeksConfig::default();
        let c = classify_flow(&cfg, &delta(0.04, -0.1, 1000), 2000);
        assert_eq!(c.signal, FlowSignal::SmartMoney);
        assert!((c.quality - 0.9).abs() < 1e-9);
    }

    #[test]
    fn rising_delta_with_falling_oi_is_fake_move() {
        let cfg = GreeksConfig::default();
        let c = classify_flow(&cfg, &delta(0.04, -0.1, 1000), -1500);
        assert_eq!(c.signal, FlowSignal::FakeMove);
        assert!((c.quality - 0.1).abs() < 1e-9);
    }

    #[test]
    fn small_delta_move_is_neutral() {
        let cfg = GreeksConfig::default();
        let c = classify_flow(&cfg, &delta(0.005, -0.01, 1000), 500);
        assert_eq!(c.signal, FlowSignal::Neutral);
    }

    #[test]
    fn fake_move_lock_expires() {
        let mut locks = FakeMoveLocks::new();
        let inst = crate::model::Instrument::new(crate::model::Underlying::Nifty, 0, 20050, crate::model::OptionType::Ce);
        let now = Instant::now();
        locks.engage(inst, now, 60);
        assert!(locks.is_locked(inst, now + Duration::from_secs(30)));
        assert!(!locks.is_locked(inst, now + Duration::from_secs(61)));
    }
}
