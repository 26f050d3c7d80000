//! Monotonic + wall clock abstraction, and the IST session-window rules from
//! spec §6.3. Grounded on the teacher's dependency-injected-clock convention
//! in `options-engine`'s tests (fixed `DateTime<Utc>` fixtures); generalized
//! here into an injectable trait so the orchestrator and its tests share one
//! source of truth instead of each constructing `Utc::now()` ad hoc.

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use std::time::{Duration, Instant};

/// IST is a fixed +05:30 offset; India observes no daylight saving time, so a
/// single constant offset is correct year-round (Open Question #4).
pub fn ist_offset() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("valid fixed offset")
}

/// A monotonic instant plus the wall-clock instant it corresponds to.
pub trait Clock: Send + Sync {
    /// Monotonic instant, used for durations (tick age, cooldown expiry, hold time).
    fn now_monotonic(&self) -> Instant;
    /// Wall clock in UTC; convert to IST via `Clock::now_ist`.
    fn now_utc(&self) -> DateTime<Utc>;

    fn now_ist(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&ist_offset())
    }
}

/// Real wall/monotonic clock for production use.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_monotonic(&self) -> Instant {
        Instant::now()
    }
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock fixed at construction and advanceable only by explicit calls,
/// so scenario tests (spec §8 S1–S6) don't drift with host wall-clock time.
#[derive(Debug, Clone)]
pub struct TestClock {
    monotonic_base: Instant,
    monotonic_offset: Duration,
    wall: DateTime<Utc>,
}

impl TestClock {
    pub fn at(wall: DateTime<Utc>) -> Self {
        Self {
            monotonic_base: Instant::now(),
            monotonic_offset: Duration::ZERO,
            wall,
        }
    }

    /// A reference instant used across the scenario tests: 2024-01-04 (a
    /// Thursday, a valid NSE weekly-expiry day) 10:00:00 IST.
    pub fn reference() -> Self {
        let ist = ist_offset();
        let wall = ist
            .with_ymd_and_hms(2024, 1, 4, 10, 0, 0)
            .single()
            .expect("valid reference timestamp")
            .with_timezone(&Utc);
        Self::at(wall)
    }

    pub fn advance(&mut self, d: Duration) {
        self.monotonic_offset += d;
        self.wall += ChronoDuration::from_std(d).expect("duration fits chrono::Duration");
    }
}

impl Clock for TestClock {
    fn now_monotonic(&self) -> Instant {
        self.monotonic_base + self.monotonic_offset
    }
    fn now_utc(&self) -> DateTime<Utc> {
        self.wall
    }
}

/// Session-window rules, spec §6.3.
pub struct Session;

impl Session {
    const OPEN: NaiveTime = NaiveTime::from_hms_opt(9, 15, 0).expect("valid time");
    const CLOSE: NaiveTime = NaiveTime::from_hms_opt(15, 30, 0).expect("valid time");
    const LUNCH_START: NaiveTime = NaiveTime::from_hms_opt(11, 30, 0).expect("valid time");
    const LUNCH_END: NaiveTime = NaiveTime::from_hms_opt(13, 0, 0).expect("valid time");
    const NO_NEW_ENTRIES_AFTER: NaiveTime = NaiveTime::from_hms_opt(15, 0, 0).expect("valid time");
    const FORCED_FLAT_AT: NaiveTime = NaiveTime::from_hms_opt(15, 15, 0).expect("valid time");

    pub fn is_weekday(ist: DateTime<FixedOffset>) -> bool {
        !matches!(ist.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Within the tradable session window (entry gate #2). The trading
    /// calendar (NSE holidays) is not decided here — see Open Question #3;
    /// callers inject a `is_holiday` predicate at the orchestrator boundary.
    pub fn is_tradable(ist: DateTime<FixedOffset>) -> bool {
        Self::is_weekday(ist) && ist.time() >= Self::OPEN && ist.time() < Self::CLOSE
    }

    pub fn is_lunch_lockout(ist: DateTime<FixedOffset>) -> bool {
        let t = ist.time();
        t >= Self::LUNCH_START && t < Self::LUNCH_END
    }

    pub fn new_entries_allowed(ist: DateTime<FixedOffset>) -> bool {
        Self::is_tradable(ist) && !Self::is_lunch_lockout(ist) && ist.time() < Self::NO_NEW_ENTRIES_AFTER
    }

    pub fn is_forced_flat_cutoff(ist: DateTime<FixedOffset>) -> bool {
        ist.time() >= Self::FORCED_FLAT_AT
    }

    /// Seconds until the lunch lockout or the forced-flat cutoff, whichever
    /// is sooner and still ahead — used by TIME_FORCED (spec §4.4 #1).
    pub fn seconds_to_next_cutoff(ist: DateTime<FixedOffset>) -> Option<i64> {
        let t = ist.time();
        let mut candidates = Vec::new();
        if t < Self::LUNCH_START {
            candidates.push(Self::LUNCH_START);
        }
        if t < Self::FORCED_FLAT_AT {
            candidates.push(Self::FORCED_FLAT_AT);
        }
        candidates
            .into_iter()
            .map(|c| (c - t).num_seconds())
            .min()
    }
}
