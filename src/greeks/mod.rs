//! The Greeks engine (spec §4.1): Black-Scholes pricing, IV inversion,
//! change tracking, zone detection, the fake-move filter, and health
//! gating, unified behind [`engine::GreeksEngine`].

pub mod black_scholes;
pub mod engine;
pub mod fake_move;
pub mod health;
pub mod iv;
pub mod tracker;
pub mod zones;

pub use black_scholes::{BlackScholes, PricedGreeks};
pub use engine::{AggregateOutputs, GreeksEngine, LegInput, VolatilityState};
pub use fake_move::{FakeMoveLocks, FlowClassification, FlowSignal};
pub use health::{HealthInputs, HealthStatus};
pub use iv::{BrokerIv, IvResult};
pub use zones::{Dominance, Zones};
