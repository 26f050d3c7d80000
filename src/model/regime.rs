//! MarketRegime (spec §3): at most one active regime, changes timestamped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketRegime {
    TrendingBull,
    TrendingBear,
    Choppy,
    HighVol,
    LowVol,
    EventDriven,
    Normal,
}

impl Default for MarketRegime {
    fn default() -> Self {
        MarketRegime::Normal
    }
}

/// A timestamped regime change, so downstream consumers (cooldown multiplier,
/// sizing posture) can tell how long the current regime has been active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeChange {
    pub regime: MarketRegime,
    pub since: DateTime<Utc>,
}
