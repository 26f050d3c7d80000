//! The orchestrator (spec §4.7): the single-writer loop that ties the
//! Greeks engine, bias engine, entry gates, exit detectors, risk layer, and
//! adaptive controller together, plus the trade journal that is adaptive
//! learning's only input.

pub mod engine;
pub mod journal;

pub use engine::{Orchestrator, OrchestratorAction};
pub use journal::{quality_score, EntryContextSnapshot, ExitContextSnapshot, JournalEntry, QualityInputs};
