//! Zone detection per chain update (spec §4.1): gamma-peak strike,
//! theta-kill strike, delta-neutral strike, CE/PE dominance.

use crate::config::GreeksConfig;
use crate::model::Chain;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dominance {
    Ce,
    Pe,
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zones {
    pub gamma_peak_strike: Option<i64>,
    pub theta_kill_strike: Option<i64>,
    pub delta_neutral_strike: Option<i64>,
    pub dominance: Dominance,
}

/// argmax Gamma across ATM +/- `span`, for CE and PE combined (the leg with
/// the larger |delta| at a given strike dominates its gamma contribution in
/// practice, but the spec asks for the chain's peak, so both legs compete).
pub fn gamma_peak_strike(chain: &Chain, span: i32) -> Option<i64> {
    chain
        .rows_near_atm(span)
        .into_iter()
        .filter_map(|row| {
            let ce_g = row.ce_greeks.map(|g| g.gamma).unwrap_or(0.0);
            let pe_g = row.pe_greeks.map(|g| g.gamma).unwrap_or(0.0);
            Some((row.strike, ce_g.max(pe_g)))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(strike, _)| strike)
}

/// argmax |Theta| across ATM +/- `span`.
pub fn theta_kill_strike(chain: &Chain, span: i32) -> Option<i64> {
    chain
        .rows_near_atm(span)
        .into_iter()
        .filter_map(|row| {
            let ce_t = row.ce_greeks.map(|g| g.theta.abs()).unwrap_or(0.0);
            let pe_t = row.pe_greeks.map(|g| g.theta.abs()).unwrap_or(0.0);
            Some((row.strike, ce_t.max(pe_t)))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(strike, _)| strike)
}

/// argmin |Delta - 0.5| for CE legs, folded with argmin |Delta + 0.5| for PE
/// legs, across ATM +/- `span`; whichever leg comes closer wins the strike.
pub fn delta_neutral_strike(chain: &Chain, span: i32) -> Option<i64> {
    chain
        .rows_near_atm(span)
        .into_iter()
        .filter_map(|row| {
            let ce_dist = row.ce_greeks.map(|g| (g.delta - 0.5).abs());
            let pe_dist = row.pe_greeks.map(|g| (g.delta + 0.5).abs());
            let best = match (ce_dist, pe_dist) {
                (Some(c), Some(p)) => c.min(p),
                (Some(c), None) => c,
                (None, Some(p)) => p,
                (None, None) => return None,
            };
            Some((row.strike, best))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(strike, _)| strike)
}

/// sign(Sum ATM+/-2 Delta_CE - |Sum ATM+/-2 Delta_PE|) with a deadband.
pub fn dominance(chain: &Chain, span: i32, deadband_pct: f64) -> Dominance {
    let rows = chain.rows_near_atm(span);
    let ce_sum: f64 = rows.iter().filter_map(|r| r.ce_greeks.map(|g| g.delta)).sum();
    let pe_sum: f64 = rows.iter().filter_map(|r| r.pe_greeks.map(|g| g.delta)).sum();
    let diff = ce_sum - pe_sum.abs();
    let scale = ce_sum.abs() + pe_sum.abs();
    if scale <= 0.0 {
        return Dominance::Balanced;
    }
    let relative = diff / scale;
    if relative.abs() <= deadband_pct {
        Dominance::Balanced
    } else if relative > 0.0 {
        Dominance::Ce
    } else {
        Dominance::Pe
    }
}

pub fn compute_zones(chain: &Chain, cfg: &GreeksConfig) -> Zones {
    Zones {
        gamma_peak_strike: gamma_peak_strike(chain, cfg.zone_strike_span),
        theta_kill_strike: theta_kill_strike(chain, cfg.zone_strike_span),
        delta_neutral_strike: delta_neutral_strike(chain, cfg.zone_strike_span),
        dominance: dominance(chain, 2, cfg.dominance_deadband_pct),
    }
}
