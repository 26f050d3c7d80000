//! The entry engine (spec §4.3): folds the ordered quality gates and, on
//! success, emits an `EntryIntent` sized by the risk layer.

use super::gates::*;
use super::strike_selection::{entry_quality_score, select_strike, QualityInputs};
use crate::config::EntryConfig;
use crate::greeks::HealthStatus;
use crate::model::{BiasState, Chain, Instrument, OptionType, Side};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryIntent {
    pub instrument: Instrument,
    pub side: Side,
    pub suggested_qty: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryDecision {
    Entry(EntryIntent),
    NoEntry(GateFailureReason),
}

/// Everything the entry engine needs that it does not own: freshness,
/// session/adaptive/risk pre-gate outcomes, and sizing. Kept as plain data
/// so the engine itself stays a pure function (design notes: "each
/// subsystem is a pure function of (state, event) -> (new state, emissions)").
pub struct EntryContext<'a> {
    pub chain: &'a Chain,
    pub bias: &'a BiasState,
    pub health: HealthStatus,
    pub tick_age_secs: f64,
    pub session_tradable: bool,
    pub adaptive_allows: bool,
    pub risk_has_capacity: bool,
    pub fake_move_locked_on_candidate: bool,
    pub spread_pct_of_mid: f64,
    pub oi_conviction: f64,
    pub clean_pattern: f64,
    pub sized_qty: u64,
}

pub struct EntryEngine {
    cfg: EntryConfig,
}

impl EntryEngine {
    pub fn new(cfg: EntryConfig) -> Self {
        Self { cfg }
    }

    pub fn evaluate(&self, ctx: &EntryContext<'_>) -> EntryDecision {
        if let Err(reason) = gate_freshness(ctx.tick_age_secs, self.cfg.max_tick_age_secs, ctx.health) {
            return EntryDecision::NoEntry(reason);
        }
        if let Err(reason) = gate_session_window(ctx.session_tradable) {
            return EntryDecision::NoEntry(reason);
        }
        if let Err(reason) = gate_bias_confirmation(ctx.bias) {
            return EntryDecision::NoEntry(reason);
        }
        if let Err(reason) = gate_adaptive_pre(ctx.adaptive_allows) {
            return EntryDecision::NoEntry(reason);
        }
        if let Err(reason) = gate_risk_pre(ctx.risk_has_capacity) {
            return EntryDecision::NoEntry(reason);
        }
        if let Err(reason) =
            gate_structural(ctx.fake_move_locked_on_candidate, ctx.spread_pct_of_mid, 0.20)
        {
            return EntryDecision::NoEntry(reason);
        }

        let Some(candidate) = select_strike(&self.cfg, ctx.chain, ctx.bias.direction) else {
            return EntryDecision::NoEntry(GateFailureReason::NoCandidateStrike);
        };

        let quality = entry_quality_score(&QualityInputs {
            bias_strength: ctx.bias.strength,
            gamma_norm: candidate.score,
            oi_conviction: ctx.oi_conviction,
            clean_pattern: ctx.clean_pattern,
        });
        if quality < self.cfg.quality_threshold {
            return EntryDecision::NoEntry(GateFailureReason::QualityTooLow);
        }

        let side = Side::Long;
        let instrument = Instrument::new(
            match ctx.chain.rows.first() {
                Some(r) => r.ce_instrument.underlying,
                None => return EntryDecision::NoEntry(GateFailureReason::NoCandidateStrike),
            },
            ctx.chain.rows.first().map(|r| r.ce_instrument.expiry_days_code).unwrap_or(0),
            candidate.strike,
            match candidate.option_type {
                OptionType::Ce => OptionType::Ce,
                OptionType::Pe => OptionType::Pe,
            },
        );

        EntryDecision::Entry(EntryIntent { instrument, side, suggested_qty: ctx.sized_qty })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, Direction, GreeksSource, Instrument as Inst, OptionRow, Underlying};

    fn row_with(strike: i64, ce_delta: f64) -> OptionRow {
        OptionRow {
            strike,
            ce_instrument: Inst::new(Underlying::Nifty, 0, strike, OptionType::Ce),
            pe_instrument: Inst::new(Underlying::Nifty, 0, strike, OptionType::Pe),
            ce_tick: None,
            pe_tick: None,
            ce_greeks: Some(crate::model::GreeksSnapshot {
                delta: ce_delta,
                gamma: 0.01,
                theta: -5.0,
                vega: 5.0,
                iv: 0.25,
                source: GreeksSource::Broker,
                computed_at_millis: 0,
            }),
            pe_greeks: None,
            degraded: false,
        }
    }

    fn strong_bullish_bias() -> BiasState {
        BiasState {
            direction: Direction::Bullish,
            strength: 0.8,
            confidence: Confidence::Strong,
            factors: crate::model::BiasFactors { oi: 0.8, volume: 0.7, greeks: 0.8, price_action: 0.7 },
        }
    }

    #[test]
    fn happy_path_emits_entry_intent() {
        let cfg = EntryConfig::default();
        let engine = EntryEngine::new(cfg);
        let chain = Chain {
            rows: vec![row_with(20000, 0.5)],
            spot: 20000.0,
            atm_strike: 20000,
            time_to_expiry_years: 0.02,
            updated_at_millis: 0,
        };
        let bias = strong_bullish_bias();
        let ctx = EntryContext {
            chain: &chain,
            bias: &bias,
            health: HealthStatus::Healthy,
            tick_age_secs: 1.0,
            session_tradable: true,
            adaptive_allows: true,
            risk_has_capacity: true,
            fake_move_locked_on_candidate: false,
            spread_pct_of_mid: 0.02,
            oi_conviction: 0.8,
            clean_pattern: 0.8,
            sized_qty: 50,
        };
        let decision = engine.evaluate(&ctx);
        assert!(matches!(decision, EntryDecision::Entry(_)));
    }

    #[test]
    fn stale_tick_blocks_before_any_other_gate() {
        let cfg = EntryConfig::default();
        let engine = EntryEngine::new(cfg);
        let chain = Chain { rows: vec![row_with(20000, 0.5)], spot: 20000.0, atm_strike: 20000, time_to_expiry_years: 0.02, updated_at_millis: 0 };
        let bias = strong_bullish_bias();
        let ctx = EntryContext {
            chain: &chain,
            bias: &bias,
            health: HealthStatus::Healthy,
            tick_age_secs: 11.0,
            session_tradable: true,
            adaptive_allows: true,
            risk_has_capacity: true,
            fake_move_locked_on_candidate: false,
            spread_pct_of_mid: 0.02,
            oi_conviction: 0.8,
            clean_pattern: 0.8,
            sized_qty: 50,
        };
        assert_eq!(engine.evaluate(&ctx), EntryDecision::NoEntry(GateFailureReason::Freshness));
    }

    #[test]
    fn fake_move_lock_blocks_at_structural_gate() {
        let cfg = EntryConfig::default();
        let engine = EntryEngine::new(cfg);
        let chain = Chain { rows: vec![row_with(20000, 0.5)], spot: 20000.0, atm_strike: 20000, time_to_expiry_years: 0.02, updated_at_millis: 0 };
        let bias = strong_bullish_bias();
        let ctx = EntryContext {
            chain: &chain,
            bias: &bias,
            health: HealthStatus::Healthy,
            tick_age_secs: 1.0,
            session_tradable: true,
            adaptive_allows: true,
            risk_has_capacity: true,
            fake_move_locked_on_candidate: true,
            spread_pct_of_mid: 0.02,
            oi_conviction: 0.8,
            clean_pattern: 0.8,
            sized_qty: 50,
        };
        assert_eq!(engine.evaluate(&ctx), EntryDecision::NoEntry(GateFailureReason::FakeMoveLocked));
    }
}
