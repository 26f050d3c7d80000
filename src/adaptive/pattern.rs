//! Pattern detector (spec §4.6): flags recurring losses that share a
//! bucket, exit reason, and time-of-day window, and emits a timed block.

use chrono::{DateTime, Duration, Utc};

use crate::config::AdaptiveConfig;
use crate::model::{ExitTriggerKind, FeatureBucket};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternBlock {
    pub bucket: FeatureBucket,
    pub trigger: ExitTriggerKind,
    pub duration_hours: i64,
}

#[derive(Debug, Clone, Copy)]
struct LossRecord {
    bucket: FeatureBucket,
    trigger: ExitTriggerKind,
    at: DateTime<Utc>,
}

/// Bounded window of recent losing exits; `detect` groups them by
/// `(bucket, trigger)` and blocks any group at or above the configured
/// loss count within the lookback window.
#[derive(Debug, Default)]
pub struct PatternDetector {
    recent_losses: Vec<LossRecord>,
}

impl PatternDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_loss(&mut self, bucket: FeatureBucket, trigger: ExitTriggerKind, at: DateTime<Utc>) {
        self.recent_losses.push(LossRecord { bucket, trigger, at });
    }

    pub fn detect(&mut self, cfg: &AdaptiveConfig, now: DateTime<Utc>, lookback_hours: i64) -> Vec<PatternBlock> {
        let cutoff = now - Duration::hours(lookback_hours);
        self.recent_losses.retain(|r| r.at >= cutoff);

        let mut blocks = Vec::new();
        let mut seen = Vec::new();
        for record in &self.recent_losses {
            let key = (record.bucket, record.trigger);
            if seen.contains(&key) {
                continue;
            }
            let count = self.recent_losses.iter().filter(|r| r.bucket == record.bucket && r.trigger == record.trigger).count();
            if count as u32 >= cfg.block_min_losses {
                blocks.push(PatternBlock { bucket: record.bucket, trigger: record.trigger, duration_hours: cfg.block_high_hours });
            }
            seen.push(key);
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BiasStrengthBucket, GreeksRegime, OiConviction, TimeOfDayBucket, VolatilityBucket};

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
    fn repeated_same_bucket_same_reason_loss_blocks() {
        let cfg = AdaptiveConfig::default();
        let mut detector = PatternDetector::new();
        let now = Utc::now();
        for i in 0..cfg.block_min_losses {
            detector.record_loss(bucket(), ExitTriggerKind::HardSl, now - Duration::minutes(i as i64));
        }
        let blocks = detector.detect(&cfg, now, 24);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].trigger, ExitTriggerKind::HardSl);
    }

    #[test]
    fn losses_outside_lookback_window_are_dropped() {
        let cfg = AdaptiveConfig::default();
        let mut detector = PatternDetector::new();
        let now = Utc::now();
        for _ in 0..cfg.block_min_losses {
            detector.record_loss(bucket(), ExitTriggerKind::HardSl, now - Duration::hours(48));
        }
        assert!(detector.detect(&cfg, now, 24).is_empty());
    }
}
