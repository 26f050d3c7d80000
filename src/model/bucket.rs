//! FeatureBucket and BucketPerformance (spec §3), the adaptive controller's
//! learning vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDayBucket {
    Opening,
    Morning,
    Lunch,
    Afternoon,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiasStrengthBucket {
    Low,
    Med,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GreeksRegime {
    HighGamma,
    HighTheta,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OiConviction {
    Strong,
    Med,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolatilityBucket {
    Low,
    Normal,
    High,
}

/// A closed-enum categorization of the context a trade was taken in,
/// used to key `BucketPerformance` and to index `PatternBlock`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureBucket {
    pub time_of_day: TimeOfDayBucket,
    pub bias_strength: BiasStrengthBucket,
    pub greeks_regime: GreeksRegime,
    pub oi_conviction: OiConviction,
    pub volatility: VolatilityBucket,
}

/// Rolling performance statistics for one bucket.
///
/// Invariant: `count >= wins`, both `>= 0` (enforced by `record_close`, the
/// only mutator).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketPerformance {
    pub count: u32,
    pub wins: u32,
    pub total_pnl: f64,
    pub last_updated: DateTime<Utc>,
}

impl BucketPerformance {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self { count: 0, wins: 0, total_pnl: 0.0, last_updated: now }
    }

    pub fn record_close(&mut self, pnl: f64, now: DateTime<Utc>) {
        self.count += 1;
        if pnl > 0.0 {
            self.wins += 1;
        }
        self.total_pnl += pnl;
        self.last_updated = now;
        debug_assert!(self.count >= self.wins);
    }

    pub fn win_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.count)
        }
    }

    pub fn losses(&self) -> u32 {
        self.count - self.wins
    }
}
