//! Weight adjuster (spec §4.6): maintains a per-bucket multiplicative weight
//! in `[weight_min, weight_max]`, bounded per-proposal and per-day.

use rustc_hash::FxHashMap;

use crate::config::AdaptiveConfig;
use crate::model::FeatureBucket;

use super::insights::InsightKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustError {
    DeltaTooLarge,
    DailyProposalCapReached,
}

#[derive(Debug)]
pub struct WeightAdjuster {
    weights: FxHashMap<FeatureBucket, f64>,
    applied_today: u32,
}

impl WeightAdjuster {
    pub fn new() -> Self {
        Self { weights: FxHashMap::default(), applied_today: 0 }
    }

    pub fn weight(&self, bucket: FeatureBucket) -> f64 {
        self.weights.get(&bucket).copied().unwrap_or(1.0)
    }

    pub fn reset_daily_count(&mut self) {
        self.applied_today = 0;
    }

    fn proposed_delta(cfg: &AdaptiveConfig, current: f64, kind: InsightKind) -> f64 {
        let target = match kind {
            InsightKind::Amplify => cfg.amplify_weight_cap,
            InsightKind::Restrict => cfg.restrict_weight_floor,
            InsightKind::Block { .. } => cfg.weight_min,
        };
        (target - current).clamp(-cfg.max_weight_delta_per_proposal, cfg.max_weight_delta_per_proposal)
    }

    /// Applies one insight's weight change, enforcing the daily-proposal cap
    /// and the per-proposal delta bound (spec §4.6, §8 invariant 5).
    pub fn apply(&mut self, cfg: &AdaptiveConfig, bucket: FeatureBucket, kind: InsightKind) -> Result<f64, AdjustError> {
        if self.applied_today >= cfg.max_applied_proposals_per_day {
            return Err(AdjustError::DailyProposalCapReached);
        }
        let current = self.weight(bucket);
        let delta = Self::proposed_delta(cfg, current, kind);
        if delta.abs() > cfg.max_weight_delta_per_proposal + 1e-9 {
            return Err(AdjustError::DeltaTooLarge);
        }
        let new_weight = (current + delta).clamp(cfg.weight_min, cfg.weight_max);
        self.weights.insert(bucket, new_weight);
        self.applied_today += 1;
        Ok(new_weight)
    }
}

impl Default for WeightAdjuster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BiasStrengthBucket, GreeksRegime, OiConviction, TimeOfDayBucket, VolatilityBucket};

    fn bucket() -> FeatureBucket {
        FeatureBucket {
            time_of_day: TimeOfDayBucket::Morning,
            bias_strength: BiasStrengthBucket::Med,
            greeks_regime: GreeksRegime::Neutral,
            oi_conviction: OiConviction::Med,
            volatility: VolatilityBucket::Normal,
        }
    }

    #[test]
    fn default_weight_is_one() {
        let adj = WeightAdjuster::new();
        assert_eq!(adj.weight(bucket()), 1.0);
    }

    #[test]
    fn amplify_raises_weight_within_cap() {
        let cfg = AdaptiveConfig::default();
        let mut adj = WeightAdjuster::new();
        let w = adj.apply(&cfg, bucket(), InsightKind::Amplify).unwrap();
        assert!(w <= cfg.weight_max);
        assert!(w > 1.0);
    }

    #[test]
    fn restrict_lowers_weight_within_floor() {
        let cfg = AdaptiveConfig::default();
        let mut adj = WeightAdjuster::new();
        let w = adj.apply(&cfg, bucket(), InsightKind::Restrict).unwrap();
        assert!(w >= cfg.weight_min);
        assert!(w < 1.0);
    }

    #[test]
    fn daily_cap_rejects_sixth_proposal() {
        let cfg = AdaptiveConfig::default();
        let mut adj = WeightAdjuster::new();
        for _ in 0..cfg.max_applied_proposals_per_day {
            assert!(adj.apply(&cfg, bucket(), InsightKind::Amplify).is_ok());
        }
        assert_eq!(adj.apply(&cfg, bucket(), InsightKind::Amplify), Err(AdjustError::DailyProposalCapReached));
    }
}
