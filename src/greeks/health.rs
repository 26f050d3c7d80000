//! Health gating (spec §4.1): aggregate chain/Greeks quality signals into a
//! single status that downstream components (entry gates, risk layer) must
//! respect.

use crate::config::GreeksConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Stale,
    Offline,
}

impl HealthStatus {
    pub fn blocks_trading(self) -> bool {
        matches!(self, HealthStatus::Unhealthy | HealthStatus::Stale | HealthStatus::Offline)
    }

    pub fn blocks_quotes(self) -> bool {
        matches!(self, HealthStatus::Stale | HealthStatus::Offline)
    }
}

/// Inputs to the health decision, one measurement per chain update.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthInputs {
    pub pct_snapshots_stale: f64,
    pub pct_snapshots_frozen: f64,
    pub max_iv_spike_abs: f64,
    pub pct_inversion_failures_last_100: f64,
    pub valid_strike_count: usize,
    pub feed_offline: bool,
}

/// Evaluate health per spec §4.1 triggers. At least `Degraded` when any
/// trigger fires; callers escalate to `Unhealthy`/`Stale` from data-freshness
/// conditions the Greeks engine itself doesn't see (feed down, kill switch).
pub fn evaluate(cfg: &GreeksConfig, inputs: &HealthInputs) -> HealthStatus {
    if inputs.feed_offline {
        return HealthStatus::Offline;
    }
    let stale_trigger = inputs.pct_snapshots_stale > 0.50;
    if stale_trigger && inputs.pct_snapshots_stale > 0.90 {
        return HealthStatus::Stale;
    }

    let frozen_trigger = inputs.pct_snapshots_frozen > cfg.frozen_snapshot_pct;
    let iv_spike_trigger = inputs.max_iv_spike_abs > cfg.iv_spike_abs_pct;
    let inversion_trigger = inputs.pct_inversion_failures_last_100 > cfg.inversion_failure_pct;
    let thin_chain_trigger = inputs.valid_strike_count < cfg.min_valid_strikes;

    let degraded_triggers =
        [stale_trigger, frozen_trigger, iv_spike_trigger, inversion_trigger, thin_chain_trigger];
    let fired = degraded_triggers.iter().filter(|t| **t).count();

    if fired >= 3 {
        HealthStatus::Unhealthy
    } else if fired >= 1 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_triggers_is_healthy() {
        let cfg = GreeksConfig::default();
        let inputs = HealthInputs { valid_strike_count: 11, ..Default::default() };
        assert_eq!(evaluate(&cfg, &inputs), HealthStatus::Healthy);
    }

    #[test]
    fn thin_chain_alone_is_degraded() {
        let cfg = GreeksConfig::default();
        let inputs = HealthInputs { valid_strike_count: 3, ..Default::default() };
        assert_eq!(evaluate(&cfg, &inputs), HealthStatus::Degraded);
    }

    #[test]
    fn many_triggers_is_unhealthy_and_blocks_trading() {
        let cfg = GreeksConfig::default();
        let inputs = HealthInputs {
            pct_snapshots_frozen: 0.9,
            max_iv_spike_abs: 0.4,
            pct_inversion_failures_last_100: 0.5,
            valid_strike_count: 11,
            ..Default::default()
        };
        let status = evaluate(&cfg, &inputs);
        assert_eq!(status, HealthStatus::Unhealthy);
        assert!(status.blocks_trading());
    }

    #[test]
    fn heavily_stale_chain_is_stale_and_blocks_quotes() {
        let cfg = GreeksConfig::default();
        let inputs = HealthInputs { pct_snapshots_stale: 0.95, valid_strike_count: 11, ..Default::default() };
        let status = evaluate(&cfg, &inputs);
        assert_eq!(status, HealthStatus::Stale);
        assert!(status.blocks_quotes());
    }

    #[test]
    fn offline_feed_overrides_everything() {
        let cfg = GreeksConfig::default();
        let inputs = HealthInputs { feed_offline: true, ..Default::default() };
        assert_eq!(evaluate(&cfg, &inputs), HealthStatus::Offline);
    }
}
