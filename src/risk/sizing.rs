//! Position sizing (spec §4.5): volatility-adjusted default, with an
//! optional Kelly-fraction mode derived from recent bucket statistics.

use crate::config::RiskConfig;

/// Piecewise volatility scalar: high IV shrinks size. Bands chosen to match
/// the Greeks engine's own IV clamp range (`GreeksConfig::iv_min/iv_max`).
fn vol_adjust(iv: f64) -> f64 {
    if iv <= 0.20 {
        1.0
    } else if iv <= 0.35 {
        0.8
    } else if iv <= 0.50 {
        0.6
    } else {
        0.4
    }
}

pub fn size_by_volatility(cfg: &RiskConfig, iv: f64) -> u64 {
    let qty = (cfg.base_qty as f64 * vol_adjust(iv)).round() as u64;
    qty.clamp(cfg.min_qty, cfg.max_qty)
}

/// Recent bucket stats feeding the Kelly estimate: `p` win probability
/// (from historical bucket win rate), `b` payoff ratio (avg win / avg loss).
#[derive(Debug, Clone, Copy)]
pub struct KellyInputs {
    pub win_probability: f64,
    pub payoff_ratio: f64,
}

/// `f = 0.25*(p*b - q)/b`, clamped to `[0, kelly_fraction_cap]` (spec §4.5).
pub fn kelly_fraction(cfg: &RiskConfig, inputs: &KellyInputs) -> f64 {
    if inputs.payoff_ratio <= 0.0 {
        return 0.0;
    }
    let p = inputs.win_probability.clamp(0.0, 1.0);
    let q = 1.0 - p;
    let raw = cfg.kelly_multiplier * (p * inputs.payoff_ratio - q) / inputs.payoff_ratio;
    raw.clamp(0.0, cfg.kelly_fraction_cap)
}

pub fn size_by_kelly(cfg: &RiskConfig, inputs: &KellyInputs, bankroll_units: f64) -> u64 {
    let fraction = kelly_fraction(cfg, inputs);
    let qty = (bankroll_units * fraction).round() as u64;
    qty.clamp(cfg.min_qty, cfg.max_qty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_iv_shrinks_size() {
        let cfg = RiskConfig::default();
        assert!(size_by_volatility(&cfg, 0.60) < size_by_volatility(&cfg, 0.10));
    }

    #[test]
    fn size_is_clamped_to_bounds() {
        let cfg = RiskConfig::default();
        let qty = size_by_volatility(&cfg, 0.10);
        assert!(qty >= cfg.min_qty && qty <= cfg.max_qty);
    }

    #[test]
    fn kelly_fraction_is_bounded() {
        let cfg = RiskConfig::default();
        let inputs = KellyInputs { win_probability: 0.9, payoff_ratio: 3.0 };
        let f = kelly_fraction(&cfg, &inputs);
        assert!(f >= 0.0 && f <= cfg.kelly_fraction_cap);
    }

    #[test]
    fn losing_edge_yields_zero_kelly_fraction() {
        let cfg = RiskConfig::default();
        let inputs = KellyInputs { win_probability: 0.2, payoff_ratio: 1.0 };
        assert_eq!(kelly_fraction(&cfg, &inputs), 0.0);
    }
}
