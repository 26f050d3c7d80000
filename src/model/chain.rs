//! OptionRow and Chain (spec §3).

use super::{GreeksSnapshot, Instrument, Tick};
use serde::{Deserialize, Serialize};

/// One strike's worth of CE/PE legs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionRow {
    pub strike: i64,
    pub ce_instrument: Instrument,
    pub pe_instrument: Instrument,
    pub ce_tick: Option<Tick>,
    pub pe_tick: Option<Tick>,
    pub ce_greeks: Option<GreeksSnapshot>,
    pub pe_greeks: Option<GreeksSnapshot>,
    /// Set by chain normalization when either leg's spread/LTP fails the
    /// quality filter (spec §4.2); degraded rows are not dropped, only
    /// flagged, so downstream consumers can still read context.
    pub degraded: bool,
}

/// A normalized option chain for one underlying/expiry, at most one active
/// per (underlying, expiry) pair (spec §3 invariant, enforced by the
/// orchestrator that owns chain construction, not by this type itself).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub rows: Vec<OptionRow>,
    pub spot: f64,
    pub atm_strike: i64,
    pub time_to_expiry_years: f64,
    /// Monotonic millis of the update that produced this chain.
    pub updated_at_millis: u64,
}

impl Chain {
    /// Invariant: strikes strictly increasing.
    pub fn strikes_strictly_increasing(&self) -> bool {
        self.rows.windows(2).all(|w| w[0].strike < w[1].strike)
    }

    pub fn atm_row(&self) -> Option<&OptionRow> {
        self.rows.iter().find(|r| r.strike == self.atm_strike)
    }

    pub fn row_at(&self, strike: i64) -> Option<&OptionRow> {
        self.rows.iter().find(|r| r.strike == strike)
    }

    /// Rows within `span` strike steps either side of the ATM row's index.
    pub fn rows_near_atm(&self, span: i32) -> Vec<&OptionRow> {
        let Some(atm_idx) = self.rows.iter().position(|r| r.strike == self.atm_strike) else {
            return Vec::new();
        };
        let lo = atm_idx.saturating_sub(span.max(0) as usize);
        let hi = (atm_idx + span.max(0) as usize + 1).min(self.rows.len());
        self.rows[lo..hi].iter().collect()
    }

    pub fn valid_strike_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.degraded).count()
    }
}
