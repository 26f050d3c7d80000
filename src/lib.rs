//! A low-latency options scalping core for Indian index options (NIFTY,
//! BANKNIFTY): Greeks computation with change tracking and fake-move
//! filtering, chain normalization and directional bias, entry quality
//! gates, priority-arbitrated exit detectors, a single-writer risk and
//! safety layer, and an end-of-day adaptive controller. Market data,
//! broker, and persistence adapters are injected through the traits in
//! [`contracts`]; this crate owns no I/O of its own.

pub mod adaptive;
pub mod chain;
pub mod clock;
pub mod config;
pub mod contracts;
pub mod entry;
pub mod error;
pub mod exits;
pub mod greeks;
pub mod model;
pub mod orchestrator;
pub mod risk;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use orchestrator::{Orchestrator, OrchestratorAction};
