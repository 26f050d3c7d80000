//! Orchestrator-level integration scenarios (spec §8): these exercise the
//! composed `Orchestrator` rather than one subsystem in isolation, since the
//! per-subsystem unit tests alongside each module already pin exact
//! threshold behavior.

use std::time::Instant;

use chrono::TimeZone;
use rustc_hash::FxHashMap;

use scalper_core::config::EngineConfig;
use scalper_core::exits::BrokerOutcome;
use scalper_core::greeks::LegInput;
use scalper_core::model::{Chain, GreeksSnapshot, GreeksSource, Instrument, InstrumentId, OptionRow, OptionType, Tick, Underlying};
use scalper_core::orchestrator::OrchestratorAction;
use scalper_core::risk::FreshnessStatus;
use scalper_core::Orchestrator;

fn row(strike: i64, ce_ltp: f64, iv: f64) -> OptionRow {
    let tick = Tick {
        monotonic_millis: 0,
        wall_millis_utc: 0,
        ltp: ce_ltp,
        bid: ce_ltp - 0.5,
        ask: ce_ltp + 0.5,
        bid_size: 10,
        ask_size: 10,
        volume: 5_000,
        open_interest: 100_000,
    };
    OptionRow {
        strike,
        ce_instrument: Instrument::new(Underlying::Nifty, 0, strike, OptionType::Ce),
        pe_instrument: Instrument::new(Underlying::Nifty, 0, strike, OptionType::Pe),
        ce_tick: Some(tick),
        pe_tick: Some(Tick { ltp: ce_ltp * 0.9, ..tick }),
        ce_greeks: Some(GreeksSnapshot { delta: 0.5, gamma: 0.015, theta: -4.0, vega: 6.0, iv, source: GreeksSource::Broker, computed_at_millis: 0 }),
        pe_greeks: Some(GreeksSnapshot { delta: -0.5, gamma: 0.015, theta: -4.0, vega: 6.0, iv, source: GreeksSource::Broker, computed_at_millis: 0 }),
        degraded: false,
    }
}

fn test_chain(now_millis: u64) -> Chain {
    Chain {
        rows: vec![row(19950, 95.0, 0.22), row(20000, 100.0, 0.22), row(20050, 80.0, 0.22)],
        spot: 20005.0,
        atm_strike: 20000,
        time_to_expiry_years: 0.02,
        updated_at_millis: now_millis,
    }
}

fn ist(now_millis: u64) -> chrono::DateTime<chrono::FixedOffset> {
    let secs_from_open = (now_millis / 1000) as i64;
    let base = scalper_core::clock::ist_offset().with_ymd_and_hms(2024, 1, 4, 10, 0, 0).single().unwrap();
    base + chrono::Duration::seconds(secs_from_open)
}

/// S3 — stale feed fail-safe: once the feed has gone unanswered past
/// `max_staleness_secs`, the risk layer's freshness check flips to
/// `EntriesBlocked` and stays there until a valid snapshot arrives again.
#[test]
fn stale_feed_blocks_entries_until_freshness_restored() {
    let cfg = EngineConfig::default();
    let max_staleness_secs = cfg.risk.max_staleness_secs;
    let mut orch = Orchestrator::new(cfg, 0);
    let leg_inputs: FxHashMap<InstrumentId, LegInput> = FxHashMap::default();

    let past_staleness_millis = ((max_staleness_secs as u64) + 1) * 1000;
    let mut chain = test_chain(0);
    let actions = orch.step(&mut chain, &leg_inputs, past_staleness_millis, Instant::now(), ist(past_staleness_millis), true);

    assert_eq!(orch.risk().freshness_status(past_staleness_millis), FreshnessStatus::EntriesBlocked);
    assert!(!actions.iter().any(|a| matches!(a, OrchestratorAction::PlaceEntry { .. })));

    let resumed_millis = past_staleness_millis + 1_000;
    let mut chain = test_chain(resumed_millis);
    let _ = orch.step(&mut chain, &leg_inputs, resumed_millis, Instant::now(), ist(resumed_millis), false);
    assert_eq!(orch.risk().freshness_status(resumed_millis), FreshnessStatus::Fresh);
}

/// Universal invariant (spec §8 #6 flavored at the orchestrator level):
/// `try_entry` is called at most once per `step()`, so at most one
/// `PlaceEntry` action can ever appear in a single step's output, and every
/// `PlaceEntry` emitted corresponds to exactly one journal entry.
#[test]
fn at_most_one_entry_per_step_and_journal_tracks_every_entry_emitted() {
    let cfg = EngineConfig::default();
    let mut orch = Orchestrator::new(cfg, 0);
    let leg_inputs: FxHashMap<InstrumentId, LegInput> = FxHashMap::default();

    let mut entries_emitted = 0usize;
    for step_idx in 0..30u64 {
        let now_millis = step_idx * 1_000;
        let spot = 20_000.0 + step_idx as f64;
        let mut chain = test_chain(now_millis);
        chain.spot = spot;
        for r in chain.rows.iter_mut() {
            if let Some(t) = r.ce_tick.as_mut() {
                t.monotonic_millis = now_millis;
                t.open_interest += step_idx * 50;
            }
        }

        let actions = orch.step(&mut chain, &leg_inputs, now_millis, Instant::now(), ist(now_millis), false);
        let entry_count = actions.iter().filter(|a| matches!(a, OrchestratorAction::PlaceEntry { .. })).count();
        assert!(entry_count <= 1, "step {step_idx} emitted {entry_count} entries");
        entries_emitted += entry_count;
    }

    assert_eq!(orch.journal().len(), entries_emitted);
}

/// A broker outcome for a trade the orchestrator has never heard of is a
/// no-op rather than a panic (defensive contract: `trades.get_mut` misses
/// short-circuit the whole call).
#[test]
fn broker_outcome_for_unknown_trade_is_a_no_op() {
    let cfg = EngineConfig::default();
    let mut orch = Orchestrator::new(cfg, 0);
    let action = orch.on_broker_exit_outcome(9999, BrokerOutcome::Filled { price: 100.0 }, 1_000);
    assert!(action.is_none());
    assert!(orch.journal().is_empty());
}

/// S6 — adaptive block, exercised at the orchestrator boundary:
/// `emergency_reset_adaptive` must bring the adaptive controller back to
/// its just-constructed state (no pattern blocks, unit weights) even though
/// the controller itself is only reachable read-only from outside the
/// orchestrator.
#[test]
fn emergency_reset_restores_default_adaptive_state() {
    let cfg = EngineConfig::default();
    let mut orch = Orchestrator::new(cfg, 0);
    orch.emergency_reset_adaptive();

    let bucket = scalper_core::model::FeatureBucket {
        time_of_day: scalper_core::model::TimeOfDayBucket::Morning,
        bias_strength: scalper_core::model::BiasStrengthBucket::Med,
        greeks_regime: scalper_core::model::GreeksRegime::Neutral,
        oi_conviction: scalper_core::model::OiConviction::Med,
        volatility: scalper_core::model::VolatilityBucket::Normal,
    };
    assert!(orch.adaptive().allows_entry(bucket, chrono::Utc::now()).is_ok());
    assert_eq!(orch.adaptive().weight(bucket), 1.0);
}

/// `run_end_of_day` on a quiet day (no closed trades) must not panic and
/// leaves the risk layer's counters in their freshly-reset state.
#[test]
fn end_of_day_on_a_quiet_day_is_harmless() {
    let cfg = EngineConfig::default();
    let mut orch = Orchestrator::new(cfg, 0);
    orch.run_end_of_day(chrono::Utc::now());
    assert_eq!(orch.open_trade_count(), 0);
    assert!(orch.journal().is_empty());
}
