//! Per-instrument ring buffer of Greeks snapshots and change tracking
//! (spec §4.1): last `N` snapshots, deltas computed against the immediately
//! previous snapshot with a minimum gap to suppress noise amplification.

use crate::model::{GreeksDelta, GreeksSnapshot, InstrumentId};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// A bounded history of snapshots for one instrument.
#[derive(Debug, Clone)]
pub struct SnapshotRing {
    buf: VecDeque<GreeksSnapshot>,
    capacity: usize,
}

impl SnapshotRing {
    pub fn new(capacity: usize) -> Self {
        Self { buf: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, snap: GreeksSnapshot) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(snap);
    }

    pub fn latest(&self) -> Option<&GreeksSnapshot> {
        self.buf.back()
    }

    pub fn previous(&self) -> Option<&GreeksSnapshot> {
        if self.buf.len() < 2 {
            None
        } else {
            self.buf.get(self.buf.len() - 2)
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &GreeksSnapshot> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Owns one ring per instrument and derives `GreeksDelta`s against the
/// previous snapshot, subject to a minimum elapsed-time gap.
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    rings: FxHashMap<InstrumentId, SnapshotRing>,
    ring_capacity: usize,
    min_gap_millis: u64,
}

impl ChangeTracker {
    pub fn new(ring_capacity: usize, min_gap_millis: u64) -> Self {
        Self { rings: FxHashMap::default(), ring_capacity, min_gap_millis }
    }

    /// Record a new snapshot and return the delta against the previous one,
    /// if the minimum gap has elapsed. A snapshot inside the noise gap is
    /// still recorded (so age/freeze detection sees it) but never produces
    /// a delta.
    pub fn record(&mut self, instrument: InstrumentId, snap: GreeksSnapshot) -> Option<GreeksDelta> {
        let ring = self.rings.entry(instrument).or_insert_with(|| SnapshotRing::new(self.ring_capacity));
        let prev = ring.latest().copied();
        ring.push(snap);
        let prev = prev?;
        let elapsed = snap.computed_at_millis.saturating_sub(prev.computed_at_millis);
        if elapsed < self.min_gap_millis {
            return None;
        }
        Some(GreeksDelta::between(&prev, &snap))
    }

    pub fn ring(&self, instrument: InstrumentId) -> Option<&SnapshotRing> {
        self.rings.get(&instrument)
    }
}
