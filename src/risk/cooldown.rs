//! Cooldown policy (spec §4.5): scheduled after every trade close, scaled
//! up after a losing streak and in high-volatility regimes.

use crate::config::RiskConfig;
use crate::model::MarketRegime;

pub fn cooldown_secs_after_close(
    cfg: &RiskConfig,
    was_win: bool,
    consecutive_losses_after: u32,
    regime: MarketRegime,
) -> u64 {
    let base = if !was_win && consecutive_losses_after >= cfg.max_consecutive_losses {
        cfg.extended_cooldown_secs
    } else if was_win {
        cfg.win_cooldown_secs
    } else {
        cfg.loss_cooldown_secs
    };

    let multiplier = if regime == MarketRegime::HighVol { cfg.high_vol_cooldown_multiplier } else { 1.0 };
    (base as f64 * multiplier).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_gets_short_cooldown() {
        let cfg = RiskConfig::default();
        assert_eq!(cooldown_secs_after_close(&cfg, true, 0, MarketRegime::TrendingBull), cfg.win_cooldown_secs);
    }

    #[test]
    fn loss_streak_triggers_extended_cooldown() {
        let cfg = RiskConfig::default();
        let secs = cooldown_secs_after_close(&cfg, false, cfg.max_consecutive_losses, MarketRegime::TrendingBull);
        assert_eq!(secs, cfg.extended_cooldown_secs);
    }

    #[test]
    fn high_vol_regime_multiplies_cooldown() {
        let cfg = RiskConfig::default();
        let normal = cooldown_secs_after_close(&cfg, false, 1, MarketRegime::TrendingBull);
        let high_vol = cooldown_secs_after_close(&cfg, false, 1, MarketRegime::HighVol);
        assert_eq!(high_vol, (normal as f64 * cfg.high_vol_cooldown_multiplier).round() as u64);
    }
}
