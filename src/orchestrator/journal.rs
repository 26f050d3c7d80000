//! Trade journal (spec §4.7): the append-only record of entry/exit context
//! and the 0-100 quality score that is the sole input to adaptive learning.

use serde::{Deserialize, Serialize};

use crate::model::{ExitTriggerKind, FeatureBucket, Trade};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryContextSnapshot {
    pub ltp: f64,
    pub bid: f64,
    pub ask: f64,
    pub open_interest: u64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub iv: f64,
    pub preceding_bar_close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitContextSnapshot {
    pub ltp: f64,
    pub delta: f64,
    pub iv: f64,
    pub open_interest: u64,
    pub exit_reason: ExitTriggerKind,
    pub pnl: f64,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub trade_id: crate::model::TradeId,
    pub bucket: FeatureBucket,
    pub entry: EntryContextSnapshot,
    pub exit: Option<ExitContextSnapshot>,
    pub quality_score: Option<f64>,
}

/// Quality score components, each capped per spec §4.7: profit <= 30,
/// speed <= 20, risk management <= 20, IV management <= 10, plus up to 20
/// for timing (entering near the start of a favorable move, not chasing).
#[derive(Debug, Clone, Copy)]
pub struct QualityInputs {
    /// Realized P&L normalized to `[-1, 1]` against a reference trade size.
    pub pnl_ratio: f64,
    /// Trade duration in seconds; faster profitable exits score higher.
    pub duration_secs: u64,
    /// True if the trade exited via a planned detector (not HardSl/forced).
    pub exited_by_plan: bool,
    /// IV move from entry to exit, signed against the trade's favorable
    /// direction (positive = IV moved against the position).
    pub adverse_iv_move_pct: f64,
    /// How close to the start of the directional move the entry landed,
    /// in `[0, 1]` where 1.0 is immediate and 0.0 is very late.
    pub timing_score: f64,
}

pub fn quality_score(inputs: &QualityInputs) -> f64 {
    let profit = (inputs.pnl_ratio.clamp(-1.0, 1.0) * 0.5 + 0.5) * 30.0;

    let speed = if inputs.duration_secs == 0 {
        20.0
    } else {
        (20.0 - (inputs.duration_secs as f64 / 60.0).min(20.0)).max(0.0)
    };

    let risk_mgmt = if inputs.exited_by_plan { 20.0 } else { 8.0 };

    let iv_mgmt = (10.0 - (inputs.adverse_iv_move_pct.max(0.0) * 50.0)).clamp(0.0, 10.0);

    let timing = inputs.timing_score.clamp(0.0, 1.0) * 20.0;

    (profit + speed + risk_mgmt + iv_mgmt + timing).clamp(0.0, 100.0)
}

pub fn context_from_trade(trade: &Trade, bucket: FeatureBucket, entry: EntryContextSnapshot) -> JournalEntry {
    JournalEntry { trade_id: trade.id, bucket, entry, exit: None, quality_score: None }
}
