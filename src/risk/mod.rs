//! Risk & safety layer (spec §4.5): capacity checks, sizing, cooldowns,
//! the data-freshness fail-safe, the kill switch, and circuit breakers,
//! unified behind [`engine::RiskEngine`].

pub mod capacity;
pub mod circuit_breaker;
pub mod cooldown;
pub mod engine;
pub mod freshness;
pub mod kill_switch;
pub mod sizing;

pub use capacity::CapacityBlock;
pub use circuit_breaker::{ApiFailureStreak, FlashCrashDetector};
pub use engine::{RiskBlock, RiskEngine};
pub use freshness::FreshnessStatus;
pub use kill_switch::KillSwitch;
pub use sizing::KellyInputs;
