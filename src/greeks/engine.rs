//! The Greeks engine (spec §4.1): ties pricing, IV resolution, change
//! tracking, zone detection, the fake-move filter, and health gating into a
//! single per-underlying update step, and exposes the aggregate signals
//! consumed by bias/entry/risk.

use super::black_scholes::BlackScholes;
use super::fake_move::{classify_flow, FakeMoveLocks, FlowSignal};
use super::health::{evaluate as evaluate_health, HealthInputs, HealthStatus};
use super::iv::{resolve_iv, BrokerIv};
use super::tracker::ChangeTracker;
use super::zones::{compute_zones, Dominance, Zones};
use crate::config::GreeksConfig;
use crate::model::{Chain, GreeksSnapshot, GreeksSource, InstrumentId};
use std::collections::VecDeque;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityState {
    Crush,
    Low,
    Mid,
    High,
    Surge,
}

/// A leg's fresh market inputs for one update: last traded price, open
/// interest, and optionally a broker-supplied IV. The broker/feed adapter
/// supplies these; pricing and sensitivities are this engine's job.
#[derive(Debug, Clone, Copy)]
pub struct LegInput {
    pub ltp: f64,
    pub open_interest: i64,
    pub broker_iv: Option<BrokerIv>,
}

/// The chain-wide signals consumed by bias/entry/risk (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateOutputs {
    pub direction_bias: f64,
    pub acceleration: f64,
    pub theta_pressure: f64,
    pub volatility_state: VolatilityState,
    pub health: HealthStatus,
    pub is_tradeable: bool,
    pub stale: bool,
    pub zones: Zones,
}

/// Single-writer Greeks engine: owns the change-tracking ring buffers and
/// fake-move locks; readers consume `AggregateOutputs`/`Chain` snapshots
/// (copy-on-write, per spec §5 shared-resource policy).
pub struct GreeksEngine {
    cfg: GreeksConfig,
    tracker: ChangeTracker,
    locks: FakeMoveLocks,
    inversion_outcomes: VecDeque<bool>,
    estimated_iv_by_instrument: rustc_hash::FxHashMap<InstrumentId, f64>,
}

impl GreeksEngine {
    pub fn new(cfg: GreeksConfig) -> Self {
        let ring_capacity = cfg.ring_buffer_len;
        let min_gap = cfg.min_snapshot_gap_millis;
        Self {
            cfg,
            tracker: ChangeTracker::new(ring_capacity, min_gap),
            locks: FakeMoveLocks::new(),
            inversion_outcomes: VecDeque::with_capacity(100),
            estimated_iv_by_instrument: rustc_hash::FxHashMap::default(),
        }
    }

    fn record_inversion_outcome(&mut self, converged: bool) {
        if self.inversion_outcomes.len() == 100 {
            self.inversion_outcomes.pop_front();
        }
        self.inversion_outcomes.push_back(converged);
    }

    fn inversion_failure_pct(&self) -> f64 {
        if self.inversion_outcomes.is_empty() {
            return 0.0;
        }
        let failures = self.inversion_outcomes.iter().filter(|c| !**c).count();
        failures as f64 / self.inversion_outcomes.len() as f64
    }

    /// Price one leg, resolve its IV, clamp to the snapshot invariants, and
    /// record change-tracking + fake-move classification.
    #[allow(clippy::too_many_arguments)]
    fn update_leg(
        &mut self,
        instrument: InstrumentId,
        spot: f64,
        strike: f64,
        time_years: f64,
        input: LegInput,
        now_monotonic_millis: u64,
        now_instant: Instant,
    ) -> GreeksSnapshot {
        let last_good = self.estimated_iv_by_instrument.get(&instrument).copied();
        let (iv, source) = resolve_iv(
            &self.cfg,
            input.broker_iv,
            instrument.option_type,
            spot,
            strike,
            time_years,
            Some(input.ltp),
            last_good,
        );
        if matches!(source, GreeksSource::BsBrokerIv) {
            self.record_inversion_outcome(true);
        } else if input.broker_iv.is_none() {
            self.record_inversion_outcome(false);
        }
        self.estimated_iv_by_instrument.insert(instrument, iv);

        let priced = BlackScholes::price_and_greeks(instrument.option_type, spot, strike, self.cfg.risk_free_rate, iv, time_years);

        let snapshot = GreeksSnapshot {
            delta: priced.delta.clamp(-1.0, 1.0),
            gamma: priced.gamma.max(0.0),
            theta: priced.theta.min(0.0),
            vega: priced.vega.max(0.0),
            iv,
            source,
            computed_at_millis: now_monotonic_millis,
        };
        snapshot.debug_assert_invariants();

        if let Some(delta) = self.tracker.record(instrument, snapshot) {
            let classification = classify_flow(&self.cfg, &delta, input.open_interest);
            if classification.signal == FlowSignal::FakeMove {
                self.locks.engage(instrument, now_instant, self.cfg.fake_move_lock_secs);
            }
        }

        snapshot
    }

    /// Update every leg in the chain in place, then compute aggregate
    /// outputs. `leg_inputs` must contain an entry for every instrument in
    /// `chain`; a missing entry leaves that leg's Greeks untouched (treated
    /// as stale by the health computation via `feed_offline`-style signals
    /// upstream).
    pub fn update_chain(
        &mut self,
        chain: &mut Chain,
        leg_inputs: &rustc_hash::FxHashMap<InstrumentId, LegInput>,
        now_monotonic_millis: u64,
        now_instant: Instant,
        feed_offline: bool,
    ) -> AggregateOutputs {
        let spot = chain.spot;
        let t = chain.time_to_expiry_years;
        for row in &mut chain.rows {
            if let Some(input) = leg_inputs.get(&row.ce_instrument) {
                row.ce_greeks = Some(self.update_leg(row.ce_instrument, spot, row.strike as f64, t, *input, now_monotonic_millis, now_instant));
            }
            if let Some(input) = leg_inputs.get(&row.pe_instrument) {
                row.pe_greeks = Some(self.update_leg(row.pe_instrument, spot, row.strike as f64, t, *input, now_monotonic_millis, now_instant));
            }
        }
        self.locks.sweep_expired(now_instant);
        self.aggregate(chain, now_monotonic_millis, feed_offline)
    }

    fn aggregate(&self, chain: &Chain, now_monotonic_millis: u64, feed_offline: bool) -> AggregateOutputs {
        let zones = compute_zones(chain, &self.cfg);

        let rows = chain.rows_near_atm(2);
        let ce_sum: f64 = rows.iter().filter_map(|r| r.ce_greeks.map(|g| g.delta)).sum();
        let pe_sum: f64 = rows.iter().filter_map(|r| r.pe_greeks.map(|g| g.delta.abs())).sum();
        let spread = ce_sum - pe_sum;
        let scale = (ce_sum.abs() + pe_sum).max(1e-9);
        let direction_bias = ((spread / scale) + 1.0 / 2.0).clamp(0.0, 1.0);

        let all_rows = &chain.rows;
        let max_gamma = all_rows
            .iter()
            .flat_map(|r| [r.ce_greeks.map(|g| g.gamma), r.pe_greeks.map(|g| g.gamma)])
            .flatten()
            .fold(0.0_f64, f64::max);
        let gamma_at_peak = zones
            .gamma_peak_strike
            .and_then(|s| chain.row_at(s))
            .map(|r| r.ce_greeks.map(|g| g.gamma).unwrap_or(0.0).max(r.pe_greeks.map(|g| g.gamma).unwrap_or(0.0)))
            .unwrap_or(0.0);
        let acceleration = if max_gamma > 0.0 { (gamma_at_peak / max_gamma).clamp(0.0, 1.0) } else { 0.0 };

        let theta_values: Vec<f64> = all_rows
            .iter()
            .flat_map(|r| [r.ce_greeks.map(|g| g.theta.abs()), r.pe_greeks.map(|g| g.theta.abs())])
            .flatten()
            .collect();
        let mean_theta = if theta_values.is_empty() { 0.0 } else { theta_values.iter().sum::<f64>() / theta_values.len() as f64 };
        let theta_at_kill = zones
            .theta_kill_strike
            .and_then(|s| chain.row_at(s))
            .map(|r| r.ce_greeks.map(|g| g.theta.abs()).unwrap_or(0.0).max(r.pe_greeks.map(|g| g.theta.abs()).unwrap_or(0.0)))
            .unwrap_or(0.0);
        let theta_pressure = if mean_theta > 0.0 { (theta_at_kill / mean_theta / 3.0).clamp(0.0, 1.0) } else { 0.0 };

        let atm_iv = chain.atm_row().and_then(|r| r.ce_greeks.map(|g| g.iv)).unwrap_or(self.cfg.default_iv);
        let volatility_state = bucket_volatility(atm_iv);

        let stale_count = chain
            .rows
            .iter()
            .flat_map(|r| [r.ce_greeks, r.pe_greeks])
            .flatten()
            .filter(|g| (now_monotonic_millis.saturating_sub(g.computed_at_millis)) as f64 / 1000.0 > self.cfg.stale_snapshot_secs)
            .count();
        let total_snaps = chain.rows.len() * 2;
        let pct_stale = if total_snaps > 0 { stale_count as f64 / total_snaps as f64 } else { 1.0 };

        let health_inputs = HealthInputs {
            pct_snapshots_stale: pct_stale,
            pct_snapshots_frozen: 0.0,
            max_iv_spike_abs: 0.0,
            pct_inversion_failures_last_100: self.inversion_failure_pct(),
            valid_strike_count: chain.valid_strike_count(),
            feed_offline,
        };
        let health = evaluate_health(&self.cfg, &health_inputs);
        let stale = health == HealthStatus::Stale;

        AggregateOutputs {
            direction_bias,
            acceleration,
            theta_pressure,
            volatility_state,
            health,
            is_tradeable: !health.blocks_trading() && !self.locks.is_any_locked(Instant::now()),
            stale,
            zones,
        }
    }

    pub fn is_strike_locked(&self, instrument: InstrumentId, now: Instant) -> bool {
        self.locks.is_locked(instrument, now)
    }

    pub fn dominance(&self, chain: &Chain) -> Dominance {
        compute_zones(chain, &self.cfg).dominance
    }
}

fn bucket_volatility(atm_iv: f64) -> VolatilityState {
    match atm_iv {
        iv if iv < 0.10 => VolatilityState::Crush,
        iv if iv < 0.15 => VolatilityState::Low,
        iv if iv < 0.25 => VolatilityState::Mid,
        iv if iv < 0.40 => VolatilityState::High,
        _ => VolatilityState::Surge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Instrument, OptionRow, OptionType, Underlying};
    use rustc_hash::FxHashMap;

    fn make_chain(spot: f64, strikes: &[i64], t: f64) -> Chain {
        let atm = *strikes.iter().min_by_key(|s| (**s - spot as i64).abs()).unwrap();
        let rows = strikes
            .iter()
            .map(|&strike| OptionRow {
                strike,
                ce_instrument: Instrument::new(Underlying::Nifty, 0, strike, OptionType::Ce),
                pe_instrument: Instrument::new(Underlying::Nifty, 0, strike, OptionType::Pe),
                ce_tick: None,
                pe_tick: None,
                ce_greeks: None,
                pe_greeks: None,
                degraded: false,
            })
            .collect();
        Chain { rows, spot, atm_strike: atm, time_to_expiry_years: t, updated_at_millis: 0 }
    }

    #[test]
    fn update_chain_produces_tradeable_health_on_clean_data() {
        let mut engine = GreeksEngine::new(GreeksConfig::default());
        let strikes: Vec<i64> = (19800..=20200).step_by(50).collect();
        let mut chain = make_chain(20000.0, &strikes, 7.0 / 365.0);

        let mut inputs = FxHashMap::default();
        for &strike in &strikes {
            let ce = Instrument::new(Underlying::Nifty, 0, strike, OptionType::Ce);
            let pe = Instrument::new(Underlying::Nifty, 0, strike, OptionType::Pe);
            let ce_price = BlackScholes::price(OptionType::Ce, 20000.0, strike as f64, 0.06, 0.22, 7.0 / 365.0);
            let pe_price = BlackScholes::price(OptionType::Pe, 20000.0, strike as f64, 0.06, 0.22, 7.0 / 365.0);
            inputs.insert(ce, LegInput { ltp: ce_price.max(0.05), open_interest: 1000, broker_iv: None });
            inputs.insert(pe, LegInput { ltp: pe_price.max(0.05), open_interest: 1000, broker_iv: None });
        }

        let out = engine.update_chain(&mut chain, &inputs, 1000, Instant::now(), false);
        assert!(matches!(out.health, HealthStatus::Healthy | HealthStatus::Degraded));
        assert!(out.is_tradeable);
        assert!(out.direction_bias >= 0.0 && out.direction_bias <= 1.0);
    }

    #[test]
    fn offline_feed_is_not_tradeable() {
        let mut engine = GreeksEngine::new(GreeksConfig::default());
        let strikes: Vec<i64> = (19900..=20100).step_by(50).collect();
        let mut chain = make_chain(20000.0, &strikes, 7.0 / 365.0);
        let out = engine.update_chain(&mut chain, &FxHashMap::default(), 1000, Instant::now(), true);
        assert_eq!(out.health, HealthStatus::Offline);
        assert!(!out.is_tradeable);
    }
}
