//! Core data model (spec §3): instrument identity, ticks, the option chain,
//! Greeks snapshots/deltas, bias state, trades and exit events, and the
//! adaptive controller's bucket/regime vocabulary.

pub mod bias;
pub mod bucket;
pub mod chain;
pub mod greeks;
pub mod instrument;
pub mod regime;
pub mod tick;
pub mod trade;

pub use bias::{BiasFactors, BiasState, Confidence, Direction};
pub use bucket::{
    BiasStrengthBucket, BucketPerformance, FeatureBucket, GreeksRegime, OiConviction, TimeOfDayBucket, VolatilityBucket,
};
pub use chain::{Chain, OptionRow};
pub use greeks::{GreeksDelta, GreeksSnapshot, GreeksSource};
pub use instrument::{Instrument, InstrumentId, OptionType, Underlying};
pub use regime::MarketRegime;
pub use tick::Tick;
pub use trade::{ExitEvent, ExitTriggerKind, Side, Trade, TradeId, TradeStatus};
