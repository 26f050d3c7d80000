//! Adaptive controller (spec §4.6): bucketed performance learning, regime
//! detection, weight adjustment, pattern-based blocks, and the safety guard
//! that gates every weight mutation, unified behind [`engine::AdaptiveController`].

pub mod confidence;
pub mod engine;
pub mod insights;
pub mod pattern;
pub mod regime;
pub mod safety_guard;
pub mod weight_adjuster;

pub use confidence::{score_confidence, ConfidenceInputs, EntryConfidence};
pub use engine::{AdaptiveBlockReason, AdaptiveController};
pub use insights::{derive_insight, Insight, InsightKind};
pub use pattern::{PatternBlock, PatternDetector};
pub use regime::{classify, posture_for, HoldingStyle, Posture, RegimeInputs};
pub use safety_guard::{GuardRejection, SafetyGuard, ShadowTestResult};
pub use weight_adjuster::{AdjustError, WeightAdjuster};
