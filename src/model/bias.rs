//! BiasState (spec §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Weak,
    Medium,
    Strong,
}

/// The four factors behind a bias computation, each normalized to `[0, 1]`
/// where 0.5 is neutral (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasFactors {
    pub oi: f64,
    pub volume: f64,
    pub greeks: f64,
    pub price_action: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasState {
    pub direction: Direction,
    pub strength: f64,
    pub confidence: Confidence,
    pub factors: BiasFactors,
}

impl BiasState {
    pub fn neutral() -> Self {
        Self {
            direction: Direction::Neutral,
            strength: 0.0,
            confidence: Confidence::Weak,
            factors: BiasFactors { oi: 0.5, volume: 0.5, greeks: 0.5, price_action: 0.5 },
        }
    }
}
