//! Confidence scorer (spec §4.6): scores one entry intent from historical
//! bucket success, regime match, recent performance, and sample adequacy,
//! then maps the score to a size multiplier.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryConfidence {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl EntryConfidence {
    pub fn size_multiplier(self) -> f64 {
        match self {
            EntryConfidence::VeryLow => 0.0,
            EntryConfidence::Low => 0.5,
            EntryConfidence::Medium => 0.8,
            EntryConfidence::High => 1.0,
            EntryConfidence::VeryHigh => 1.2,
        }
    }

    pub fn blocks_entry(self) -> bool {
        self == EntryConfidence::VeryLow
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceInputs {
    /// Historical win rate for this bucket, in `[0, 1]`.
    pub bucket_success: f64,
    /// 1.0 if the current regime matches the bucket's best-performing
    /// regime, scaled down otherwise.
    pub regime_match: f64,
    /// Recent (e.g. last 10 trades) performance, normalized to `[0, 1]`.
    pub recent_performance: f64,
    /// Sample adequacy: `min(1.0, count / min_sample_size)`.
    pub sample_adequacy: f64,
}

/// Weighted composite: bucket success (0.4) + regime match (0.25) + recent
/// performance (0.2) + sample adequacy (0.15), then bucketed into a level.
pub fn score_confidence(inputs: &ConfidenceInputs) -> EntryConfidence {
    let score = 0.4 * inputs.bucket_success.clamp(0.0, 1.0)
        + 0.25 * inputs.regime_match.clamp(0.0, 1.0)
        + 0.2 * inputs.recent_performance.clamp(0.0, 1.0)
        + 0.15 * inputs.sample_adequacy.clamp(0.0, 1.0);

    if score < 0.20 {
        EntryConfidence::VeryLow
    } else if score < 0.45 {
        EntryConfidence::Low
    } else if score < 0.65 {
        EntryConfidence::Medium
    } else if score < 0.85 {
        EntryConfidence::High
    } else {
        EntryConfidence::VeryHigh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_inputs_yield_very_high() {
        let inputs = ConfidenceInputs { bucket_success: 1.0, regime_match: 1.0, recent_performance: 1.0, sample_adequacy: 1.0 };
        assert_eq!(score_confidence(&inputs), EntryConfidence::VeryHigh);
    }

    #[test]
    fn zero_inputs_yield_very_low_and_block() {
        let inputs = ConfidenceInputs { bucket_success: 0.0, regime_match: 0.0, recent_performance: 0.0, sample_adequacy: 0.0 };
        let c = score_confidence(&inputs);
        assert_eq!(c, EntryConfidence::VeryLow);
        assert!(c.blocks_entry());
        assert_eq!(c.size_multiplier(), 0.0);
    }

    #[test]
    fn size_multiplier_is_monotonic_in_confidence() {
        assert!(EntryConfidence::Low.size_multiplier() < EntryConfidence::Medium.size_multiplier());
        assert!(EntryConfidence::Medium.size_multiplier() < EntryConfidence::High.size_multiplier());
        assert!(EntryConfidence::High.size_multiplier() < EntryConfidence::VeryHigh.size_multiplier());
    }
}
