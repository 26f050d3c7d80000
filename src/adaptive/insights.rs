//! Per-bucket insights (spec §4.6): the end-of-day learning loop's output
//! for one `FeatureBucket`, derived purely from its `BucketPerformance`.

use crate::config::AdaptiveConfig;
use crate::model::{BucketPerformance, FeatureBucket};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InsightKind {
    Amplify,
    Restrict,
    Block { duration_hours: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insight {
    pub bucket: FeatureBucket,
    pub kind: InsightKind,
}

/// Derives at most one insight per bucket; buckets below `min_sample_size`
/// produce none (spec §4.6: "requires min sample_size per bucket before
/// emitting an insight").
pub fn derive_insight(cfg: &AdaptiveConfig, bucket: FeatureBucket, perf: &BucketPerformance) -> Option<Insight> {
    if perf.count < cfg.min_sample_size {
        return None;
    }

    if perf.losses() >= cfg.block_min_losses && perf.total_pnl < 0.0 {
        let duration_hours = if perf.win_rate() == 0.0 { cfg.block_critical_hours } else { cfg.block_high_hours };
        return Some(Insight { bucket, kind: InsightKind::Block { duration_hours } });
    }
    if perf.win_rate() >= cfg.amplify_win_rate && perf.total_pnl > 0.0 {
        return Some(Insight { bucket, kind: InsightKind::Amplify });
    }
    if perf.win_rate() <= cfg.restrict_win_rate {
        return Some(Insight { bucket, kind: InsightKind::Restrict });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BiasStrengthBucket, GreeksRegime, OiConviction, TimeOfDayBucket, VolatilityBucket};
    use chrono::Utc;

    fn bucket() -> FeatureBucket {
        FeatureBucket {
            time_of_day: TimeOfDayBucket::Opening,
            bias_strength: BiasStrengthBucket::High,
            greeks_regime: GreeksRegime::Neutral,
            oi_conviction: OiConviction::Strong,
            volatility: VolatilityBucket::Normal,
        }
    }

    #[test]
    fn below_sample_size_yields_no_insight() {
        let cfg = AdaptiveConfig::default();
        let mut perf = BucketPerformance::empty(Utc::now());
        for _ in 0..5 {
            perf.record_close(10.0, Utc::now());
        }
        assert!(derive_insight(&cfg, bucket(), &perf).is_none());
    }

    #[test]
    fn high_win_rate_positive_pnl_amplifies() {
        let cfg = AdaptiveConfig::default();
        let mut perf = BucketPerformance::empty(Utc::now());
        for _ in 0..15 {
            perf.record_close(10.0, Utc::now());
        }
        for _ in 0..5 {
            perf.record_close(-5.0, Utc::now());
        }
        let insight = derive_insight(&cfg, bucket(), &perf).unwrap();
        assert_eq!(insight.kind, InsightKind::Amplify);
    }

    #[test]
    fn low_win_rate_with_net_positive_pnl_restricts_without_blocking() {
        // Enough losses to clear block_min_losses, but big winners keep the
        // bucket net positive, so BLOCK's pnl<0 condition doesn't apply.
        let cfg = AdaptiveConfig::default();
        let mut perf = BucketPerformance::empty(Utc::now());
        for _ in 0..8 {
            perf.record_close(50.0, Utc::now());
        }
        for _ in 0..12 {
            perf.record_close(-20.0, Utc::now());
        }
        let insight = derive_insight(&cfg, bucket(), &perf).unwrap();
        assert_eq!(insight.kind, InsightKind::Restrict);
    }

    #[test]
    fn all_losses_blocks_critical() {
        let cfg = AdaptiveConfig::default();
        let mut perf = BucketPerformance::empty(Utc::now());
        for _ in 0..20 {
            perf.record_close(-10.0, Utc::now());
        }
        let insight = derive_insight(&cfg, bucket(), &perf).unwrap();
        assert_eq!(insight.kind, InsightKind::Block { duration_hours: cfg.block_critical_hours });
    }
}
