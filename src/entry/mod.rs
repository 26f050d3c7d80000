//! Entry engine & quality gates (spec §4.3).

pub mod engine;
pub mod gates;
pub mod strike_selection;

pub use engine::{EntryContext, EntryDecision, EntryEngine, EntryIntent};
pub use gates::GateFailureReason;
pub use strike_selection::{QualityInputs, StrikeCandidate};
