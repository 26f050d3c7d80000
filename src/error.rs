//! Error kinds for the scalping core.
//!
//! Two tiers, per the crate's error-handling design: library code returns
//! [`EngineError`] (via `thiserror`) at boundaries where a typed error is
//! actionable; the process entry point wraps these in `anyhow::Result` with
//! `.context(..)`. Policy rejections (risk/adaptive blocks) are plain enum
//! values, never `Result::Err` — see `crate::risk::BlockReason`.

use thiserror::Error;

/// Abstract error kinds from the data/math/broker/state/policy taxonomy.
/// Variants never carry raw broker payloads; those are the adapter's concern.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Chain or tick data was stale, missing, or malformed.
    #[error("data error: {0}")]
    Data(String),

    /// A math routine (IV inversion, Greeks) could not produce a finite result.
    #[error("math error: {0}")]
    Math(String),

    /// A broker call failed. Transient errors are retried by the caller;
    /// this variant only records that the boundary surfaced one.
    #[error("broker error: {0}")]
    Broker(String),

    /// An invariant of the trade/position state machine was violated, e.g. an
    /// event applied to an already-closed trade. Logged and dropped by the
    /// caller; never recovered mid-flight.
    #[error("state error: {0}")]
    State(String),

    /// Configuration failed validation at load time.
    #[error("config error: {0}")]
    Config(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
