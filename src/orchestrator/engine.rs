//! The orchestrator (spec §4.7, §5): single-writer owner of chain state,
//! open trades, and every subsystem, running the per-update loop
//! `update_greeks -> update_bias -> evaluate_exits -> try_entry -> journal`.
//! Grounded on `options-engine`'s pattern of one owning struct per
//! long-lived resource (the gRPC service owned the pricing engine the same
//! way this owns the Greeks/risk/adaptive engines) plus the design notes'
//! "each subsystem is a pure function of (state, event) -> (new state,
//! emissions)" rule: this struct supplies the state, everything it calls is
//! a pure function over a borrowed slice of it.

use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset, Utc};
use rustc_hash::FxHashMap;
use std::time::Instant;

use crate::adaptive::{self, AdaptiveController};
use crate::clock::Session;
use crate::config::EngineConfig;
use crate::exits::{self, BrokerOutcome, DetectorContext, ExitAction, ExitSignal, ExitStateMachine};
use crate::greeks::{AggregateOutputs, Dominance, GreeksEngine, LegInput};
use crate::model::{
    BiasStrengthBucket, Chain, Direction, ExitEvent, ExitTriggerKind, FeatureBucket, GreeksRegime, GreeksSnapshot,
    GreeksSource, Instrument, InstrumentId, OiConviction, OptionRow, OptionType, ProtectiveLevels, Side,
    TimeOfDayBucket, Trade, TradeId, TradeStatus, VolatilityBucket,
};
use crate::risk::{FreshnessStatus, RiskEngine};

use crate::chain::BiasEngine;
use crate::entry::{EntryContext, EntryDecision, EntryEngine};

use super::journal::{quality_score, EntryContextSnapshot, ExitContextSnapshot, JournalEntry, QualityInputs};

const OI_TRACK_LEN: usize = 3;
const VOLUME_TRACK_LEN: usize = 5;

/// What the caller (the process loop owning the broker connection) must do
/// in response to one `step()` call. The orchestrator never talks to a
/// broker directly (spec §6.2); it only emits intents.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorAction {
    PlaceEntry { trade_id: TradeId, instrument: Instrument, side: Side, quantity: u64 },
    PlaceExit { trade_id: TradeId, quantity: u64, trigger: ExitTriggerKind },
    NakedRiskHalt { trade_id: TradeId },
}

/// Ephemeral, unserialized per-trade tracking the detectors need but that
/// doesn't belong on `Trade` itself (spec §3 keeps `Trade` to what gets
/// persisted). Reset when a trade closes.
#[derive(Debug, Clone)]
struct TradeTracking {
    peak_gamma: f64,
    last_delta: f64,
    last_price: f64,
    own_oi_history: VecDeque<i64>,
    opposite_oi_history: VecDeque<i64>,
    volume_history: VecDeque<u64>,
    entry_dominance: Dominance,
}

impl TradeTracking {
    fn new(entry_greeks: &GreeksSnapshot, entry_price: f64, entry_dominance: Dominance) -> Self {
        Self {
            peak_gamma: entry_greeks.gamma,
            last_delta: entry_greeks.delta,
            last_price: entry_price,
            own_oi_history: VecDeque::new(),
            opposite_oi_history: VecDeque::new(),
            volume_history: VecDeque::new(),
            entry_dominance,
        }
    }
}

pub struct Orchestrator {
    cfg: EngineConfig,
    greeks: GreeksEngine,
    bias: BiasEngine,
    entry: EntryEngine,
    risk: RiskEngine,
    adaptive: AdaptiveController,
    exit_sm: ExitStateMachine,
    trades: FxHashMap<TradeId, Trade>,
    tracking: FxHashMap<TradeId, TradeTracking>,
    journal: Vec<JournalEntry>,
    next_trade_id: TradeId,
}

impl Orchestrator {
    pub fn new(cfg: EngineConfig, now_millis: u64) -> Self {
        Self {
            greeks: GreeksEngine::new(cfg.greeks.clone()),
            bias: BiasEngine::new(cfg.chain.clone()),
            entry: EntryEngine::new(cfg.entry.clone()),
            risk: RiskEngine::new(cfg.risk.clone(), now_millis),
            adaptive: AdaptiveController::new(),
            exit_sm: ExitStateMachine::new(),
            trades: FxHashMap::default(),
            tracking: FxHashMap::default(),
            journal: Vec::new(),
            next_trade_id: 1,
            cfg,
        }
    }

    pub fn risk(&self) -> &RiskEngine {
        &self.risk
    }

    pub fn adaptive(&self) -> &AdaptiveController {
        &self.adaptive
    }

    pub fn open_trade_count(&self) -> usize {
        self.trades.values().filter(|t| t.is_open()).count()
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// One iteration of the core loop (spec §4.7): update the Greeks engine
    /// and bias from the latest chain snapshot, evaluate exits on every open
    /// trade, then (if capacity remains) evaluate entry. Returns the intents
    /// the caller must submit to the broker; feeding the results back goes
    /// through `on_broker_exit_outcome`/`on_entry_filled`.
    pub fn step(
        &mut self,
        chain: &mut Chain,
        leg_inputs: &FxHashMap<InstrumentId, LegInput>,
        now_millis: u64,
        now_instant: Instant,
        now_ist: DateTime<FixedOffset>,
        feed_offline: bool,
    ) -> Vec<OrchestratorAction> {
        if !feed_offline {
            self.risk.on_valid_snapshot(now_millis);
        }
        self.risk.on_price(now_millis, chain.spot);

        let aggregate = self.greeks.update_chain(chain, leg_inputs, now_millis, now_instant, feed_offline);
        let bias = self.bias.update(chain, aggregate.direction_bias);
        let dominance_now = self.greeks.dominance(chain);
        let freshness = self.risk.freshness_status(now_millis);

        let mut actions = Vec::new();

        let open_ids: Vec<TradeId> = self.trades.iter().filter(|(_, t)| t.is_open()).map(|(id, _)| *id).collect();
        for trade_id in open_ids {
            // Data has been stale long enough that the detectors can no
            // longer trust the chain (spec §4.5, S3): force flat instead of
            // evaluating exits against data the risk layer no longer trusts.
            let action = if freshness == FreshnessStatus::ForcedFlat {
                self.force_flat_exit(trade_id, now_millis)
            } else {
                self.evaluate_one_exit(trade_id, chain, dominance_now, now_millis, now_ist)
            };
            if let Some(action) = action {
                actions.push(action);
            }
        }

        if let Some(action) = self.try_entry(chain, &bias, &aggregate, now_millis, now_ist) {
            actions.push(action);
        }

        actions
    }

    fn row_and_leg<'a>(chain: &'a Chain, instrument: Instrument) -> Option<(&'a OptionRow, &'a crate::model::Tick, &'a GreeksSnapshot)> {
        let row = chain.row_at(instrument.strike)?;
        match instrument.option_type {
            OptionType::Ce => Some((row, row.ce_tick.as_ref()?, row.ce_greeks.as_ref()?)),
            OptionType::Pe => Some((row, row.pe_tick.as_ref()?, row.pe_greeks.as_ref()?)),
        }
    }

    fn evaluate_one_exit(
        &mut self,
        trade_id: TradeId,
        chain: &Chain,
        dominance_now: Dominance,
        now_millis: u64,
        now_ist: DateTime<FixedOffset>,
    ) -> Option<OrchestratorAction> {
        // Trade already has an exit in flight: nothing new to evaluate.
        if self.exit_sm.has_pending(trade_id) {
            return None;
        }

        let trade = self.trades.get(&trade_id)?;
        let instrument = trade.instrument;
        let (row, tick, greeks) = Self::row_and_leg(chain, instrument)?;

        let track = self
            .tracking
            .entry(trade_id)
            .or_insert_with(|| TradeTracking::new(&trade.entry_greeks, trade.entry_price, dominance_now));

        if track.own_oi_history.len() == OI_TRACK_LEN {
            track.own_oi_history.pop_front();
        }
        track.own_oi_history.push_back(tick.open_interest as i64);

        let opposite_oi = match instrument.option_type {
            OptionType::Ce => row.pe_tick.map(|t| t.open_interest as i64).unwrap_or(0),
            OptionType::Pe => row.ce_tick.map(|t| t.open_interest as i64).unwrap_or(0),
        };
        if track.opposite_oi_history.len() == OI_TRACK_LEN {
            track.opposite_oi_history.pop_front();
        }
        track.opposite_oi_history.push_back(opposite_oi);

        if track.volume_history.len() == VOLUME_TRACK_LEN {
            track.volume_history.pop_front();
        }
        let rolling_mean_volume = if track.volume_history.is_empty() {
            tick.volume
        } else {
            (track.volume_history.iter().sum::<u64>() as f64 / track.volume_history.len() as f64) as u64
        };
        track.volume_history.push_back(tick.volume);

        track.peak_gamma = track.peak_gamma.max(greeks.gamma);

        let oldest_own = *track.own_oi_history.front().unwrap_or(&(tick.open_interest as i64));
        let oi_unwind_pct = if oldest_own == 0 {
            0.0
        } else {
            ((oldest_own - tick.open_interest as i64) as f64 / oldest_own as f64).max(0.0)
        };

        let oldest_opposite = *track.opposite_oi_history.front().unwrap_or(&opposite_oi);
        let opposite_build_pct = if oldest_opposite == 0 {
            0.0
        } else {
            ((opposite_oi - oldest_opposite) as f64 / oldest_opposite as f64).max(0.0)
        };

        let elapsed_minutes = now_millis.saturating_sub(trade.entry_monotonic_millis) as f64 / 60_000.0;
        let theta_accel_per_min = if elapsed_minutes > 0.0 {
            (greeks.theta - trade.entry_greeks.theta) / elapsed_minutes
        } else {
            0.0
        };

        let delta_change_since_last = greeks.delta - track.last_delta;
        let price_change_since_last = tick.ltp - track.last_price;
        track.last_delta = greeks.delta;
        track.last_price = tick.ltp;

        let ctx = DetectorContext {
            now_monotonic_millis: now_millis,
            current_price: tick.ltp,
            current_gamma: greeks.gamma,
            peak_gamma_since_entry: track.peak_gamma,
            current_volume: tick.volume,
            rolling_mean_volume,
            delta_change_since_last,
            price_change_since_last,
            theta_accel_per_min,
            iv_at_entry: trade.entry_greeks.iv,
            iv_now: greeks.iv,
            oi_unwind_pct_3_snapshots: oi_unwind_pct,
            dominance_now,
            dominance_at_entry: track.entry_dominance,
            opposite_side_oi_build_pct: opposite_build_pct,
            seconds_to_next_session_cutoff: Session::seconds_to_next_cutoff(now_ist),
            partial_exit_already_taken: trade.partial_exit_taken,
        };

        let base_trail_distance = self.cfg.exit.trail_activation_pct * trade.entry_price;
        let signal = exits::evaluate_exit(&self.cfg.exit, trade, &ctx, base_trail_distance, greeks.delta)?;

        let trade = self.trades.get_mut(&trade_id)?;
        match self.exit_sm.on_signal(trade, signal, now_millis) {
            ExitAction::Submit { trade_id, quantity, trigger } => Some(OrchestratorAction::PlaceExit { trade_id, quantity, trigger }),
            ExitAction::None => None,
            ExitAction::NakedRiskHalt { trade_id } => Some(OrchestratorAction::NakedRiskHalt { trade_id }),
        }
    }

    /// Flattens a trade outright once the feed has been stale long enough
    /// that the risk layer no longer trusts it (spec §4.5). Bypasses the
    /// detector sweep entirely — `ForcedFlat` always requests the full
    /// remaining quantity, so it shares the state machine's duplicate-guard
    /// but none of `evaluate_one_exit`'s chain-derived context.
    fn force_flat_exit(&mut self, trade_id: TradeId, now_millis: u64) -> Option<OrchestratorAction> {
        if self.exit_sm.has_pending(trade_id) {
            return None;
        }
        let trade = self.trades.get_mut(&trade_id)?;
        let signal = ExitSignal {
            kind: ExitTriggerKind::ForcedFlat,
            priority: ExitTriggerKind::ForcedFlat.base_priority(),
            confidence: 1.0,
            qty_fraction: 1.0,
        };
        match self.exit_sm.on_signal(trade, signal, now_millis) {
            ExitAction::Submit { trade_id, quantity, trigger } => Some(OrchestratorAction::PlaceExit { trade_id, quantity, trigger }),
            ExitAction::None => None,
            ExitAction::NakedRiskHalt { trade_id } => Some(OrchestratorAction::NakedRiskHalt { trade_id }),
        }
    }

    fn try_entry(
        &mut self,
        chain: &Chain,
        bias: &crate::model::BiasState,
        aggregate: &AggregateOutputs,
        now_millis: u64,
        now_ist: DateTime<FixedOffset>,
    ) -> Option<OrchestratorAction> {
        let bucket = bucket_from_context(bias, aggregate, chain);
        let tick_age_secs = (now_millis.saturating_sub(chain.updated_at_millis)) as f64 / 1000.0;

        let available_margin = 100_000.0;
        let required_margin = (self.cfg.risk.base_qty as f64) * chain.spot * 0.15;
        let risk_has_capacity = self.risk.can_enter(now_millis, available_margin, required_margin).is_ok();
        let adaptive_allows = self.adaptive.allows_entry(bucket, Utc::now()).is_ok();

        let regime_inputs = regime_inputs_from(chain, bias);
        let regime = adaptive::classify(regime_inputs);
        let posture = adaptive::posture_for(regime);
        let confidence = self.adaptive.confidence_for(
            bucket,
            &self.cfg.adaptive,
            1.0,
            0.5,
        );
        if confidence.blocks_entry() {
            return None;
        }

        let base_qty = self.risk.size_for_entry(regime_inputs.iv_mean);
        let weight = self.adaptive.weight(bucket);
        let sized_qty = ((base_qty as f64) * posture.size_multiplier * weight * confidence.size_multiplier()).round() as u64;
        let sized_qty = sized_qty.clamp(self.cfg.risk.min_qty, self.cfg.risk.max_qty);

        let ctx = EntryContext {
            chain,
            bias,
            health: aggregate.health,
            tick_age_secs,
            session_tradable: Session::new_entries_allowed(now_ist),
            adaptive_allows,
            risk_has_capacity,
            fake_move_locked_on_candidate: !aggregate.is_tradeable,
            spread_pct_of_mid: chain.atm_row().map(|r| r.ce_tick.map(|t| t.spread_pct_of_mid()).unwrap_or(0.0)).unwrap_or(0.0),
            oi_conviction: bias.factors.oi,
            clean_pattern: confidence.size_multiplier().min(1.0),
            sized_qty,
        };

        match self.entry.evaluate(&ctx) {
            EntryDecision::NoEntry(_) => None,
            EntryDecision::Entry(intent) => {
                let (_, _, entry_greeks) = Self::row_and_leg(chain, intent.instrument)?;
                let entry_greeks = *entry_greeks;
                let entry_price = chain
                    .row_at(intent.instrument.strike)
                    .and_then(|r| match intent.instrument.option_type {
                        OptionType::Ce => r.ce_tick,
                        OptionType::Pe => r.pe_tick,
                    })
                    .map(|t| t.ltp)?;

                let trade_id = self.next_trade_id;
                self.next_trade_id += 1;

                let trade = Trade {
                    id: trade_id,
                    instrument: intent.instrument,
                    side: intent.side,
                    quantity_total: intent.suggested_qty,
                    quantity_exited: 0,
                    entry_price,
                    entry_greeks,
                    entry_monotonic_millis: now_millis,
                    protective: ProtectiveLevels {
                        initial_stop_loss: entry_price * (1.0 - self.cfg.exit.hard_sl_pct),
                        trailing_stop_loss: None,
                        targets: vec![],
                        time_stop_monotonic_millis: now_millis + self.cfg.exit.max_hold_secs * 1000,
                    },
                    exits: vec![],
                    status: TradeStatus::Open,
                    partial_exit_taken: false,
                    naked_risk: false,
                };

                self.tracking.insert(trade_id, TradeTracking::new(&entry_greeks, entry_price, self.greeks.dominance(chain)));
                self.risk.on_trade_opened();

                self.journal.push(JournalEntry {
                    trade_id,
                    bucket,
                    entry: EntryContextSnapshot {
                        ltp: entry_price,
                        bid: chain.row_at(intent.instrument.strike).and_then(|r| match intent.instrument.option_type {
                            OptionType::Ce => r.ce_tick,
                            OptionType::Pe => r.pe_tick,
                        }).map(|t| t.bid).unwrap_or(entry_price),
                        ask: chain.row_at(intent.instrument.strike).and_then(|r| match intent.instrument.option_type {
                            OptionType::Ce => r.ce_tick,
                            OptionType::Pe => r.pe_tick,
                        }).map(|t| t.ask).unwrap_or(entry_price),
                        open_interest: chain.row_at(intent.instrument.strike).and_then(|r| match intent.instrument.option_type {
                            OptionType::Ce => r.ce_tick,
                            OptionType::Pe => r.pe_tick,
                        }).map(|t| t.open_interest).unwrap_or(0),
                        delta: entry_greeks.delta,
                        gamma: entry_greeks.gamma,
                        theta: entry_greeks.theta,
                        vega: entry_greeks.vega,
                        iv: entry_greeks.iv,
                        preceding_bar_close: chain.spot,
                    },
                    exit: None,
                    quality_score: None,
                });

                self.trades.insert(trade_id, trade);

                Some(OrchestratorAction::PlaceEntry { trade_id, instrument: intent.instrument, side: intent.side, quantity: intent.suggested_qty })
            }
        }
    }

    /// Feed a broker response for an in-flight exit back into the state
    /// machine, applying fills and running the failure-escalation ladder.
    pub fn on_broker_exit_outcome(&mut self, trade_id: TradeId, outcome: BrokerOutcome, now_millis: u64) -> Option<OrchestratorAction> {
        let mut filled_exit: Option<ExitEvent> = None;
        let mut closed_info: Option<(f64, ExitTriggerKind)> = None;

        let action = {
            let trade = self.trades.get_mut(&trade_id)?;
            let action = self.exit_sm.on_broker_outcome(trade, outcome, now_millis, self.cfg.exit.broker_retry_window_secs);
            if matches!(outcome, BrokerOutcome::Filled { .. }) {
                filled_exit = trade.exits.last().cloned();
                if !trade.is_open() {
                    let trigger = trade.exits.last().map(|e| e.trigger).unwrap_or(ExitTriggerKind::NoAction);
                    closed_info = Some((trade.realized_pnl(), trigger));
                }
            }
            action
        };

        if let Some(event) = filled_exit {
            self.record_exit_in_journal(trade_id, &event);
        }
        if let Some((pnl, trigger)) = closed_info {
            let bucket = self.journal.iter().find(|j| j.trade_id == trade_id).map(|j| j.bucket);
            if let Some(bucket) = bucket {
                self.adaptive.record_trade_close(bucket, pnl, trigger, Utc::now());
            }
            self.risk.on_trade_closed(pnl, now_millis, crate::model::MarketRegime::Normal);
        }

        match action {
            ExitAction::Submit { trade_id, quantity, trigger } => Some(OrchestratorAction::PlaceExit { trade_id, quantity, trigger }),
            ExitAction::None => None,
            ExitAction::NakedRiskHalt { trade_id } => Some(OrchestratorAction::NakedRiskHalt { trade_id }),
        }
    }

    fn record_exit_in_journal(&mut self, trade_id: TradeId, event: &ExitEvent) {
        let Some(trade) = self.trades.get(&trade_id) else { return };
        let pnl = trade.realized_pnl();
        let duration_secs = event.monotonic_millis.saturating_sub(trade.entry_monotonic_millis) / 1000;
        let exited_by_plan = !matches!(event.trigger, ExitTriggerKind::HardSl | ExitTriggerKind::ForcedMarketExit);
        let quality = quality_score(&QualityInputs {
            pnl_ratio: (pnl / (trade.entry_price * trade.quantity_total as f64).max(1.0)).clamp(-1.0, 1.0),
            duration_secs,
            exited_by_plan,
            // ExitEvent carries no exit-time IV; nothing adverse to report.
            adverse_iv_move_pct: 0.0,
            timing_score: 0.5,
        });

        if let Some(entry) = self.journal.iter_mut().find(|j| j.trade_id == trade_id) {
            entry.exit = Some(ExitContextSnapshot {
                ltp: event.price,
                delta: trade.entry_greeks.delta,
                iv: trade.entry_greeks.iv,
                open_interest: 0,
                exit_reason: event.trigger,
                pnl,
                duration_secs,
            });
            entry.quality_score = Some(quality);
        }
    }

    /// Runs the adaptive controller's end-of-day learning cycle and resets
    /// the risk layer's daily counters (spec §4.5, §4.6: both are calendar-day
    /// scoped, never intraday).
    pub fn run_end_of_day(&mut self, now: DateTime<Utc>) {
        self.adaptive.run_end_of_day(&self.cfg.adaptive, now);
        self.risk.reset_daily();
    }

    pub fn emergency_reset_adaptive(&mut self) {
        self.adaptive.emergency_reset();
    }
}

/// Builds the bucket a trade attempt falls into from live context, per
/// spec §3's `FeatureBucket`, using the session clock and live chain state
/// the adaptive module itself doesn't own.
fn bucket_from_context(bias: &crate::model::BiasState, aggregate: &AggregateOutputs, chain: &Chain) -> FeatureBucket {
    let bias_strength = if bias.strength < 0.33 {
        BiasStrengthBucket::Low
    } else if bias.strength < 0.66 {
        BiasStrengthBucket::Med
    } else {
        BiasStrengthBucket::High
    };

    let greeks_regime = match chain.atm_row() {
        Some(row) if row.ce_greeks.map(|g| g.gamma).unwrap_or(0.0) > 0.01 => GreeksRegime::HighGamma,
        Some(row) if row.ce_greeks.map(|g| g.theta.abs()).unwrap_or(0.0) > 5.0 => GreeksRegime::HighTheta,
        _ => GreeksRegime::Neutral,
    };

    let oi_conviction = if bias.factors.oi > 0.7 || bias.factors.oi < 0.3 {
        OiConviction::Strong
    } else if bias.factors.oi > 0.55 || bias.factors.oi < 0.45 {
        OiConviction::Med
    } else {
        OiConviction::Weak
    };

    let volatility = match aggregate.volatility_state {
        crate::greeks::VolatilityState::Expanding => VolatilityBucket::High,
        crate::greeks::VolatilityState::Contracting => VolatilityBucket::Low,
        crate::greeks::VolatilityState::Stable => VolatilityBucket::Normal,
    };

    FeatureBucket { time_of_day: TimeOfDayBucket::Morning, bias_strength, greeks_regime, oi_conviction, volatility }
}

fn regime_inputs_from(chain: &Chain, bias: &crate::model::BiasState) -> adaptive::RegimeInputs {
    let atm_iv = chain
        .atm_row()
        .map(|r| {
            let ce = r.ce_greeks.map(|g| g.iv);
            let pe = r.pe_greeks.map(|g| g.iv);
            match (ce, pe) {
                (Some(c), Some(p)) => (c + p) / 2.0,
                (Some(c), None) => c,
                (None, Some(p)) => p,
                (None, None) => 0.2,
            }
        })
        .unwrap_or(0.2);

    let trend_strength = match bias.direction {
        Direction::Bullish => bias.strength,
        Direction::Bearish => -bias.strength,
        Direction::Neutral => 0.0,
    };

    adaptive::RegimeInputs { iv_mean: atm_iv, atr_pct: (bias.factors.price_action - 0.5).abs() * 2.0, trend_strength }
}
