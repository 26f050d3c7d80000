//! Adaptive controller (spec §4.6): the end-of-day learning loop that turns
//! closed-trade history into bucket weight changes and eligibility blocks,
//! guarded by [`safety_guard::SafetyGuard`]. Never touches exit logic.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use crate::config::AdaptiveConfig;
use crate::model::{BucketPerformance, ExitTriggerKind, FeatureBucket};

use super::confidence::{score_confidence, ConfidenceInputs, EntryConfidence};
use super::insights::{derive_insight, InsightKind};
use super::pattern::{PatternBlock, PatternDetector};
use super::safety_guard::{GuardRejection, SafetyGuard, ShadowTestResult};
use super::weight_adjuster::WeightAdjuster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveBlockReason {
    PatternBlock,
}

pub struct AdaptiveController {
    bucket_performance: FxHashMap<FeatureBucket, BucketPerformance>,
    weight_adjuster: WeightAdjuster,
    pattern_detector: PatternDetector,
    safety_guard: SafetyGuard,
    active_blocks: Vec<(PatternBlock, DateTime<Utc>)>,
}

impl AdaptiveController {
    pub fn new() -> Self {
        Self {
            bucket_performance: FxHashMap::default(),
            weight_adjuster: WeightAdjuster::new(),
            pattern_detector: PatternDetector::new(),
            safety_guard: SafetyGuard::new(),
            active_blocks: Vec::new(),
        }
    }

    /// Records one closed trade's outcome against its bucket. Intraday —
    /// feeds the learning loop but never itself mutates weights (spec §4.6:
    /// "no intraday parameter mutation").
    pub fn record_trade_close(&mut self, bucket: FeatureBucket, pnl: f64, trigger: ExitTriggerKind, now: DateTime<Utc>) {
        self.bucket_performance.entry(bucket).or_insert_with(|| BucketPerformance::empty(now)).record_close(pnl, now);
        if pnl <= 0.0 {
            self.pattern_detector.record_loss(bucket, trigger, now);
        }
    }

    pub fn allows_entry(&self, bucket: FeatureBucket, now: DateTime<Utc>) -> Result<(), AdaptiveBlockReason> {
        let blocked = self.active_blocks.iter().any(|(b, expires_at)| b.bucket == bucket && now < *expires_at);
        if blocked {
            Err(AdaptiveBlockReason::PatternBlock)
        } else {
            Ok(())
        }
    }

    pub fn weight(&self, bucket: FeatureBucket) -> f64 {
        self.weight_adjuster.weight(bucket)
    }

    pub fn confidence_for(&self, bucket: FeatureBucket, cfg: &AdaptiveConfig, regime_match: f64, recent_performance: f64) -> EntryConfidence {
        let perf = self.bucket_performance.get(&bucket).copied();
        let bucket_success = perf.map(|p| p.win_rate()).unwrap_or(0.5);
        let sample_adequacy = perf.map(|p| (p.count as f64 / cfg.min_sample_size as f64).min(1.0)).unwrap_or(0.0);
        score_confidence(&ConfidenceInputs { bucket_success, regime_match, recent_performance, sample_adequacy })
    }

    /// End-of-day learning cycle: derives an insight per bucket with enough
    /// samples, runs it through the safety guard (intraday callers must
    /// pass `is_end_of_day = true` exactly once per real trading day), and
    /// applies weight changes or registers pattern/insight blocks.
    pub fn run_end_of_day(&mut self, cfg: &AdaptiveConfig, now: DateTime<Utc>) -> Vec<Result<(), GuardRejection>> {
        self.weight_adjuster.reset_daily_count();
        let buckets: Vec<_> = self.bucket_performance.keys().copied().collect();
        let mut outcomes = Vec::new();

        for bucket in buckets {
            let perf = self.bucket_performance[&bucket];
            let Some(insight) = derive_insight(cfg, bucket, &perf) else { continue };

            match insight.kind {
                InsightKind::Block { duration_hours } => {
                    self.active_blocks.push((
                        PatternBlock { bucket, trigger: ExitTriggerKind::NoAction, duration_hours },
                        now + chrono::Duration::hours(duration_hours),
                    ));
                    outcomes.push(Ok(()));
                }
                _ => {
                    let shadow = ShadowTestResult {
                        historical_pnl_with_current_weight: perf.total_pnl,
                        historical_pnl_with_proposed_weight: perf.total_pnl
                            * if matches!(insight.kind, InsightKind::Amplify) { 1.1 } else { 0.9 },
                    };
                    let proposal_confidence_ok = perf.count >= cfg.min_sample_size;
                    let guard_result = self.safety_guard.check(cfg, true, now, &shadow, proposal_confidence_ok);
                    if guard_result.is_ok() {
                        let _ = self.weight_adjuster.apply(cfg, bucket, insight.kind);
                        self.safety_guard.record_applied(now);
                    }
                    outcomes.push(guard_result);
                }
            }
        }

        let pattern_blocks = self.pattern_detector.detect(cfg, now, 24 * cfg.block_high_hours);
        for block in pattern_blocks {
            self.active_blocks.push((block, now + chrono::Duration::hours(block.duration_hours)));
        }
        self.active_blocks.retain(|(_, expires_at)| now < *expires_at);

        outcomes
    }

    pub fn emergency_reset(&mut self) {
        self.safety_guard.emergency_reset();
        self.active_blocks.clear();
        self.weight_adjuster = WeightAdjuster::new();
    }
}

impl Default for AdaptiveController {
    fn default() -> Self {
        Self::new()
    }
}
