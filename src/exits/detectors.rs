//! The eight exit detectors (spec §4.4), each a pure function of a shared
//! `DetectorContext` over one trade. None of these touch the trade's state
//! machine; `arbitration` picks the winner and the orchestrator applies it.

use crate::config::ExitConfig;
use crate::greeks::Dominance;
use crate::model::{ExitTriggerKind, Trade};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitSignal {
    pub kind: ExitTriggerKind,
    pub priority: f64,
    pub confidence: f64,
    /// Fraction of the remaining quantity this signal wants to close; `1.0`
    /// for full exits.
    pub qty_fraction: f64,
}

impl ExitSignal {
    fn new(kind: ExitTriggerKind, confidence: f64, qty_fraction: f64) -> Self {
        Self { kind, priority: kind.base_priority(), confidence, qty_fraction }
    }
}

/// Everything a detector needs, gathered by the exit orchestrator from the
/// Greeks tracker, the chain, and the trade itself. Kept flat and `Copy`
/// where practical so detectors stay pure and cheap to call every tick
/// (spec §5: all computation between suspensions must be O(strikes), <=5ms).
#[derive(Debug, Clone, Copy)]
pub struct DetectorContext {
    pub now_monotonic_millis: u64,
    pub current_price: f64,
    pub current_gamma: f64,
    pub peak_gamma_since_entry: f64,
    pub current_volume: u64,
    pub rolling_mean_volume: u64,
    pub delta_change_since_last: f64,
    pub price_change_since_last: f64,
    pub theta_accel_per_min: f64,
    pub iv_at_entry: f64,
    pub iv_now: f64,
    pub oi_unwind_pct_3_snapshots: f64,
    pub dominance_now: Dominance,
    pub dominance_at_entry: Dominance,
    pub opposite_side_oi_build_pct: f64,
    pub seconds_to_next_session_cutoff: Option<i64>,
    pub partial_exit_already_taken: bool,
}

fn profit_pct(trade: &Trade, current_price: f64) -> f64 {
    let sign = match trade.side {
        crate::model::Side::Long => 1.0,
        crate::model::Side::Short => -1.0,
    };
    sign * (current_price - trade.entry_price) / trade.entry_price
}

pub fn time_forced(cfg: &ExitConfig, trade: &Trade, ctx: &DetectorContext) -> Option<ExitSignal> {
    let held_secs = (ctx.now_monotonic_millis.saturating_sub(trade.entry_monotonic_millis)) / 1000;
    let cutoff_imminent = ctx.seconds_to_next_session_cutoff.is_some_and(|s| s <= 0);
    if cutoff_imminent || held_secs >= cfg.max_hold_secs {
        return Some(ExitSignal::new(ExitTriggerKind::TimeForced, 0.99, 1.0));
    }
    None
}

pub fn theta_bomb(cfg: &ExitConfig, trade: &Trade, ctx: &DetectorContext) -> Option<ExitSignal> {
    let held_secs = (ctx.now_monotonic_millis.saturating_sub(trade.entry_monotonic_millis)) / 1000;
    let iv_crush = if ctx.iv_at_entry > 0.0 { (ctx.iv_at_entry - ctx.iv_now) / ctx.iv_at_entry } else { 0.0 };
    let theta_worsening = ctx.theta_accel_per_min <= cfg.theta_accel_per_min;
    let iv_crushed = iv_crush >= cfg.iv_crush_pct;
    let time_capped = held_secs >= cfg.theta_time_cap_secs;
    if theta_worsening || iv_crushed || time_capped {
        let confidence = if theta_worsening && iv_crushed { 0.95 } else { 0.90 };
        return Some(ExitSignal::new(ExitTriggerKind::ThetaBomb, confidence, 1.0));
    }
    None
}

pub fn reversal(cfg: &ExitConfig, ctx: &DetectorContext) -> Option<ExitSignal> {
    let unwinding = ctx.oi_unwind_pct_3_snapshots > cfg.reversal_oi_unwind_pct;
    let flipped = ctx.dominance_now != ctx.dominance_at_entry && ctx.dominance_now != Dominance::Balanced;
    let opposite_build = ctx.opposite_side_oi_build_pct > cfg.reversal_oi_unwind_pct;

    let score = [unwinding, flipped, opposite_build].iter().filter(|b| **b).count() as f64 / 3.0;
    if score >= cfg.reversal_score_threshold {
        return Some(ExitSignal::new(ExitTriggerKind::Reversal, 0.75 + 0.10 * score, 1.0));
    }
    None
}

pub fn exhaustion(cfg: &ExitConfig, ctx: &DetectorContext) -> Option<ExitSignal> {
    let gamma_drop = if ctx.peak_gamma_since_entry > 0.0 {
        (ctx.peak_gamma_since_entry - ctx.current_gamma) / ctx.peak_gamma_since_entry
    } else {
        0.0
    };
    let gamma_collapse = gamma_drop >= cfg.exhaustion_gamma_drop_pct;

    let volume_climax = ctx.rolling_mean_volume > 0
        && ctx.current_volume as f64 > cfg.exhaustion_volume_multiple * ctx.rolling_mean_volume as f64
        && ctx.delta_change_since_last.abs() < 0.1;

    let delta_divergence = ctx.price_change_since_last.abs() >= 2.0 && ctx.delta_change_since_last.abs() < 0.1;

    if gamma_collapse || volume_climax || delta_divergence {
        let fired = [gamma_collapse, volume_climax, delta_divergence].iter().filter(|b| **b).count();
        let confidence = 0.70 + 0.10 * (fired.min(3) as f64 - 1.0).max(0.0);
        return Some(ExitSignal::new(ExitTriggerKind::Exhaustion, confidence.min(0.90), 1.0));
    }
    None
}

pub fn partial_exit(cfg: &ExitConfig, trade: &Trade, ctx: &DetectorContext) -> Option<ExitSignal> {
    if ctx.partial_exit_already_taken || trade.partial_exit_taken {
        return None;
    }
    let profit = profit_pct(trade, ctx.current_price);
    let gamma_flattening = ctx.peak_gamma_since_entry > 0.0 && ctx.current_gamma < 0.8 * ctx.peak_gamma_since_entry;
    let volume_dropping = ctx.rolling_mean_volume > 0 && ctx.current_volume < ctx.rolling_mean_volume;

    if profit > cfg.partial_profit_threshold_pct && gamma_flattening && volume_dropping {
        let rung = cfg.partial_exit_ladder.rungs.first().copied().unwrap_or(0.6);
        return Some(ExitSignal::new(ExitTriggerKind::PartialExit, 0.80, rung));
    }
    None
}

/// `f(gamma, delta)` scaling the trail distance (spec §4.4 detector 6):
/// higher gamma/delta means price can move faster, so the trail tightens.
fn trail_distance_factor(gamma: f64, delta: f64) -> f64 {
    (1.0 - (gamma.min(0.05) / 0.05) * 0.5 - (delta.abs().min(1.0)) * 0.2).clamp(0.3, 1.0)
}

pub fn trailing_sl(
    cfg: &ExitConfig,
    trade: &Trade,
    ctx: &DetectorContext,
    base_trail_distance: f64,
    current_delta: f64,
) -> Option<ExitSignal> {
    let profit = profit_pct(trade, ctx.current_price);
    if profit < cfg.trail_activation_pct {
        return None;
    }
    let factor = trail_distance_factor(ctx.current_gamma, current_delta);
    let candidate_sl = ctx.current_price - factor * base_trail_distance;
    let new_sl = trade.protective.trailing_stop_loss.map_or(candidate_sl, |prior| prior.max(candidate_sl));

    if ctx.current_price <= new_sl {
        Some(ExitSignal::new(ExitTriggerKind::TrailingSl, 0.85, 1.0))
    } else {
        None
    }
}

pub fn hard_sl(trade: &Trade, ctx: &DetectorContext) -> Option<ExitSignal> {
    let sign = match trade.side {
        crate::model::Side::Long => 1.0,
        crate::model::Side::Short => -1.0,
    };
    let breached = sign * (ctx.current_price - trade.protective.initial_stop_loss) <= 0.0;
    if breached {
        Some(ExitSignal::new(ExitTriggerKind::HardSl, 1.0, 1.0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GreeksSnapshot, GreeksSource, Instrument, OptionType, ProtectiveLevels, Side, TradeStatus, Underlying};

    fn base_ctx() -> DetectorContext {
        DetectorContext {
            now_monotonic_millis: 10_000,
            current_price: 105.0,
            current_gamma: 0.01,
            peak_gamma_since_entry: 0.01,
            current_volume: 100,
            rolling_mean_volume: 100,
            delta_change_since_last: 0.0,
            price_change_since_last: 0.0,
            theta_accel_per_min: 0.0,
            iv_at_entry: 0.2,
            iv_now: 0.2,
            oi_unwind_pct_3_snapshots: 0.0,
            dominance_now: Dominance::Balanced,
            dominance_at_entry: Dominance::Balanced,
            opposite_side_oi_build_pct: 0.0,
            seconds_to_next_session_cutoff: None,
            partial_exit_already_taken: false,
        }
    }

    fn base_trade() -> Trade {
        Trade {
            id: 1,
            instrument: Instrument::new(Underlying::Nifty, 0, 20000, OptionType::Ce),
            side: Side::Long,
            quantity_total: 50,
            quantity_exited: 0,
            entry_price: 100.0,
            entry_greeks: GreeksSnapshot { delta: 0.5, gamma: 0.01, theta: -5.0, vega: 5.0, iv: 0.2, source: GreeksSource::Broker, computed_at_millis: 0 },
            entry_monotonic_millis: 0,
            protective: ProtectiveLevels { initial_stop_loss: 98.0, trailing_stop_loss: None, targets: vec![], time_stop_monotonic_millis: 600_000 },
            exits: vec![],
            status: TradeStatus::Open,
            partial_exit_taken: false,
            naked_risk: false,
        }
    }

    #[test]
    fn time_forced_fires_after_max_hold() {
        let cfg = ExitConfig::default();
        let trade = base_trade();
        let mut ctx = base_ctx();
        ctx.now_monotonic_millis = (cfg.max_hold_secs + 1) * 1000;
        assert!(time_forced(&cfg, &trade, &ctx).is_some());
    }

    #[test]
    fn time_forced_fires_near_cutoff() {
        let cfg = ExitConfig::default();
        let trade = base_trade();
        let mut ctx = base_ctx();
        ctx.seconds_to_next_session_cutoff = Some(0);
        assert!(time_forced(&cfg, &trade, &ctx).is_some());
    }

    #[test]
    fn hard_sl_fires_on_breach() {
        let trade = base_trade();
        let mut ctx = base_ctx();
        ctx.current_price = 97.0;
        assert!(hard_sl(&trade, &ctx).is_some());
    }

    #[test]
    fn hard_sl_does_not_fire_above_stop() {
        let trade = base_trade();
        let ctx = base_ctx();
        assert!(hard_sl(&trade, &ctx).is_none());
    }

    #[test]
    fn trailing_sl_requires_activation_profit() {
        let cfg = ExitConfig::default();
        let trade = base_trade();
        let mut ctx = base_ctx();
        ctx.current_price = 100.1; // below 0.5% activation
        assert!(trailing_sl(&cfg, &trade, &ctx, 2.0, 0.5).is_none());
    }

    #[test]
    fn exhaustion_fires_on_gamma_collapse() {
        let cfg = ExitConfig::default();
        let mut ctx = base_ctx();
        ctx.peak_gamma_since_entry = 0.02;
        ctx.current_gamma = 0.005;
        assert!(exhaustion(&cfg, &ctx).is_some());
    }

    #[test]
    fn partial_exit_requires_all_three_conditions() {
        let cfg = ExitConfig::default();
        let trade = base_trade();
        let mut ctx = base_ctx();
        ctx.current_price = 101.0; // 1% profit, above default 0.8% threshold
        ctx.peak_gamma_since_entry = 0.02;
        ctx.current_gamma = 0.01;
        ctx.rolling_mean_volume = 200;
        ctx.current_volume = 50;
        assert!(partial_exit(&cfg, &trade, &ctx).is_some());
    }
}
