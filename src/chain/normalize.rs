//! Chain normalization (spec §4.2): filter to ATM +/- K, align CE/PE legs,
//! flag rows whose spread or LTP fails the quality filter as degraded.

use crate::config::ChainConfig;
use crate::model::{Chain, OptionRow, Tick};

/// Build a normalized chain from raw per-strike tick pairs. `raw_rows` must
/// already be sorted by strike; this function filters to the ATM window and
/// marks degraded rows, but does not drop them (spec §4.2: "mark as
/// degraded", not remove — removing would break the strictly-increasing
/// strike invariant other components rely on for strike-relative math).
pub fn normalize(
    cfg: &ChainConfig,
    spot: f64,
    strike_step: i64,
    raw_rows: Vec<(OptionRow, Option<Tick>, Option<Tick>)>,
    time_to_expiry_years: f64,
    updated_at_millis: u64,
) -> Chain {
    let atm_strike = nearest_strike(spot, strike_step);
    let window = i64::from(cfg.atm_window) * strike_step;

    let mut rows: Vec<OptionRow> = raw_rows
        .into_iter()
        .filter(|(row, _, _)| (row.strike - atm_strike).abs() <= window)
        .map(|(mut row, ce_tick, pe_tick)| {
            row.ce_tick = ce_tick;
            row.pe_tick = pe_tick;
            row.degraded = is_degraded(cfg, ce_tick) || is_degraded(cfg, pe_tick);
            row
        })
        .collect();

    rows.sort_by_key(|r| r.strike);
    rows.dedup_by_key(|r| r.strike);

    Chain { rows, spot, atm_strike, time_to_expiry_years, updated_at_millis }
}

fn is_degraded(cfg: &ChainConfig, tick: Option<Tick>) -> bool {
    match tick {
        None => true,
        Some(t) => t.ltp <= 0.0 || t.spread_pct_of_mid() > cfg.max_spread_pct_of_mid,
    }
}

fn nearest_strike(spot: f64, step: i64) -> i64 {
    let step_f = step as f64;
    ((spot / step_f).round() as i64) * step
}
