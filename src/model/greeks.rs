//! GreeksSnapshot and GreeksDelta (spec §3).

use serde::{Deserialize, Serialize};

/// Where an IV value in a snapshot came from, in priority order (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GreeksSource {
    Broker,
    BsBrokerIv,
    BsEstimatedIv,
    DefaultIv,
}

/// A point-in-time Greeks computation for one instrument.
///
/// Invariants (spec §3, asserted in `GreeksSnapshot::new`):
/// `|delta| <= 1`, `gamma >= 0`, `theta <= 0` for long options, `vega >= 0`,
/// `0.01 <= iv <= 3.0` (clamped by the caller before construction).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreeksSnapshot {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub iv: f64,
    pub source: GreeksSource,
    /// Monotonic millis at which this snapshot was computed.
    pub computed_at_millis: u64,
}

impl GreeksSnapshot {
    pub fn debug_assert_invariants(&self) {
        debug_assert!(self.delta.abs() <= 1.0 + 1e-9, "|delta| must be <= 1: {}", self.delta);
        debug_assert!(self.gamma >= -1e-9, "gamma must be >= 0: {}", self.gamma);
        debug_assert!(self.theta <= 1e-9, "theta must be <= 0 for long options: {}", self.theta);
        debug_assert!(self.vega >= -1e-9, "vega must be >= 0: {}", self.vega);
        debug_assert!((0.01 - 1e-9..=3.0 + 1e-9).contains(&self.iv), "iv out of clamp range: {}", self.iv);
    }
}

/// The change between two adjacent same-instrument snapshots (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreeksDelta {
    pub delta_delta: f64,
    pub delta_gamma: f64,
    pub delta_theta: f64,
    pub delta_vega: f64,
    pub elapsed_millis: u64,
}

impl GreeksDelta {
    pub fn between(prev: &GreeksSnapshot, curr: &GreeksSnapshot) -> Self {
        Self {
            delta_delta: curr.delta - prev.delta,
            delta_gamma: curr.gamma - prev.gamma,
            delta_theta: curr.theta - prev.theta,
            delta_vega: curr.vega - prev.vega,
            elapsed_millis: curr.computed_at_millis.saturating_sub(prev.computed_at_millis),
        }
    }
}
