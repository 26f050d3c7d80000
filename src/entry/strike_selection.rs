//! Strike selection and entry quality scoring (spec §4.3 gates 7-8).

use crate::config::EntryConfig;
use crate::model::{Chain, Direction, OptionRow, OptionType};

/// Score one candidate row's leg on the bias side:
/// `0.4*|delta| + 0.3*gamma_norm + 0.3*iv_fit`, IV fit peaking in the
/// configured band.
fn score_leg(cfg: &EntryConfig, delta: f64, gamma: f64, iv: f64, max_gamma: f64) -> f64 {
    let gamma_norm = if max_gamma > 0.0 { (gamma / max_gamma).clamp(0.0, 1.0) } else { 0.0 };
    let center = (cfg.iv_fit_center_low + cfg.iv_fit_center_high) / 2.0;
    let half_width = (cfg.iv_fit_center_high - cfg.iv_fit_center_low) / 2.0;
    let iv_fit = if half_width > 0.0 { (1.0 - ((iv - center).abs() / half_width)).clamp(0.0, 1.0) } else { 0.0 };
    0.4 * delta.abs() + 0.3 * gamma_norm + 0.3 * iv_fit
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeCandidate {
    pub strike: i64,
    pub option_type: OptionType,
    pub delta: f64,
    pub score: f64,
}

/// Select the best strike in ATM +/- `window` for the bias's side, among
/// legs whose |delta| falls in `[delta_band_low, delta_band_high]`.
pub fn select_strike(cfg: &EntryConfig, chain: &Chain, direction: Direction) -> Option<StrikeCandidate> {
    let option_type = match direction {
        Direction::Bullish => OptionType::Ce,
        Direction::Bearish => OptionType::Pe,
        Direction::Neutral => return None,
    };

    let rows = chain.rows_near_atm(cfg.strike_window);
    let max_gamma = rows
        .iter()
        .filter_map(|r| leg_greeks(r, option_type))
        .map(|g| g.gamma)
        .fold(0.0_f64, f64::max);

    rows.into_iter()
        .filter(|r| !r.degraded)
        .filter_map(|r| {
            let g = leg_greeks(r, option_type)?;
            if g.delta.abs() < cfg.delta_band_low || g.delta.abs() > cfg.delta_band_high {
                return None;
            }
            let score = score_leg(cfg, g.delta, g.gamma, g.iv, max_gamma);
            Some(StrikeCandidate { strike: r.strike, option_type, delta: g.delta, score })
        })
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

fn leg_greeks(row: &OptionRow, option_type: OptionType) -> Option<crate::model::GreeksSnapshot> {
    match option_type {
        OptionType::Ce => row.ce_greeks,
        OptionType::Pe => row.pe_greeks,
    }
}

/// Composite entry quality score (spec §4.3 gate 8): bias strength, gamma,
/// OI conviction, and pattern cleanliness, each contributing up to 0.25.
#[derive(Debug, Clone, Copy)]
pub struct QualityInputs {
    pub bias_strength: f64,
    pub gamma_norm: f64,
    pub oi_conviction: f64,
    pub clean_pattern: f64,
}

pub fn entry_quality_score(inputs: &QualityInputs) -> f64 {
    0.25 * inputs.bias_strength.clamp(0.0, 1.0)
        + 0.25 * inputs.gamma_norm.clamp(0.0, 1.0)
        + 0.25 * inputs.oi_conviction.clamp(0.0, 1.0)
        + 0.25 * inputs.clean_pattern.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GreeksSource, Instrument, Underlying};

    fn row_with(strike: i64, ce_delta: f64, ce_gamma: f64, ce_iv: f64) -> OptionRow {
        OptionRow {
            strike,
            ce_instrument: Instrument::new(Underlying::Nifty, 0, strike, OptionType::Ce),
            pe_instrument: Instrument::new(Underlying::Nifty, 0, strike, OptionType::Pe),
            ce_tick: None,
            pe_tick: None,
            ce_greeks: Some(crate::model::GreeksSnapshot {
                delta: ce_delta,
                gamma: ce_gamma,
                theta: -5.0,
                vega: 5.0,
                iv: ce_iv,
                source: GreeksSource::Broker,
                computed_at_millis: 0,
            }),
            pe_greeks: None,
            degraded: false,
        }
    }

    #[test]
    fn picks_highest_scoring_strike_within_delta_band() {
        let cfg = EntryConfig::default();
        let rows = vec![row_with(19950, 0.75, 0.01, 0.25), row_with(20000, 0.5, 0.02, 0.25), row_with(20050, 0.25, 0.005, 0.25)];
        let chain = Chain { rows, spot: 20000.0, atm_strike: 20000, time_to_expiry_years: 0.02, updated_at_millis: 0 };
        let candidate = select_strike(&cfg, &chain, Direction::Bullish).unwrap();
        assert_eq!(candidate.strike, 20000);
    }

    #[test]
    fn out_of_band_delta_is_excluded() {
        let cfg = EntryConfig::default();
        let rows = vec![row_with(20000, 0.9, 0.01, 0.25)];
        let chain = Chain { rows, spot: 20000.0, atm_strike: 20000, time_to_expiry_years: 0.02, updated_at_millis: 0 };
        assert!(select_strike(&cfg, &chain, Direction::Bullish).is_none());
    }

    #[test]
    fn quality_score_is_bounded() {
        let inputs = QualityInputs { bias_strength: 1.0, gamma_norm: 1.0, oi_conviction: 1.0, clean_pattern: 1.0 };
        assert!((entry_quality_score(&inputs) - 1.0).abs() < 1e-9);
    }
}
