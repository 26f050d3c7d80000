//! External interface contracts (spec §6): thin async traits for the
//! market-data feed, broker, persistence sink, and the control surface.
//! Implementations (websocket clients, broker SDK wiring, a database) are
//! out of scope here; the core only depends on these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ExitEvent, Instrument, Tick, Trade};

/// Hook for reconnect-responsibility handoff (spec §6.1): the feed owns
/// reconnection; the core only needs to know when it lost and regained
/// the stream so the risk layer's freshness fail-safe can react.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    async fn subscribe(&self, instrument: Instrument) -> anyhow::Result<()>;
    async fn unsubscribe(&self, instrument: Instrument) -> anyhow::Result<()>;
    fn on_feed_down(&self);
    fn on_feed_up(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    SlLimit,
    SlMarket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderVariety {
    Normal,
    StopLoss,
    Robo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderProduct {
    CarryForward,
    Intraday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDuration {
    Day,
    Ioc,
}

/// A broker order request. Price/trigger/quantity are carried as `String`
/// per the Indian-broker wire convention the teacher's chain normalization
/// already follows for numeric fields (spec §6.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub idempotency_key: String,
    pub instrument: Instrument,
    pub side: OrderSide,
    pub quantity: u64,
    pub order_type: OrderType,
    pub price: Option<String>,
    pub trigger: Option<String>,
    pub variety: OrderVariety,
    pub product: OrderProduct,
    pub duration: OrderDuration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderId(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: Instrument,
    pub quantity: i64,
    pub average_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RmsLimits {
    pub available_margin: f64,
    pub used_margin: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker call timed out")]
    Timeout,
    #[error("broker rate limit exceeded")]
    RateLimited,
    #[error("broker authentication failed")]
    AuthFailed,
    #[error("insufficient margin")]
    InsufficientMargin,
    #[error("broker rejected: {0}")]
    Rejected(String),
}

/// Every call returns an explicit `Result` (spec §6.2: "no exceptions leak
/// to core logic"). Callers supply `idempotency_key` on `place_order` so a
/// retried call after a timeout cannot double-submit.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn place_order(&self, request: OrderRequest) -> Result<OrderId, BrokerError>;
    async fn modify_order(&self, order_id: &OrderId, new_price: Option<String>, new_trigger: Option<String>, new_qty: Option<u64>) -> Result<(), BrokerError>;
    async fn cancel_order(&self, order_id: &OrderId, variety: OrderVariety) -> Result<(), BrokerError>;
    async fn get_ltp(&self, instrument: Instrument) -> Result<f64, BrokerError>;
    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError>;
    async fn get_rms_limits(&self) -> Result<RmsLimits, BrokerError>;
}

/// Append-only durability sink (spec §6.4). Implementations guarantee
/// at-least-once delivery and fsync on `persist_trade_close`.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn persist_tick(&self, tick: &Tick) -> anyhow::Result<()>;
    async fn persist_exit_event(&self, trade_id: crate::model::TradeId, event: &ExitEvent) -> anyhow::Result<()>;
    async fn persist_trade_close(&self, trade: &Trade) -> anyhow::Result<()>;
    async fn persist_eod_snapshot(&self, snapshot_json: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentHealth {
    Up,
    Degraded,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub feed: ComponentHealth,
    pub broker: ComponentHealth,
    pub greeks_engine: ComponentHealth,
    pub risk_layer: ComponentHealth,
    pub adaptive: ComponentHealth,
}

/// Process exit codes (spec §6.5), named here so `main.rs` and tests share
/// one source of truth instead of magic numbers.
pub mod exit_code {
    pub const CLEAN: i32 = 0;
    pub const CONFIG_ERROR: i32 = 2;
    pub const BROKER_AUTH_ERROR: i32 = 3;
    pub const FEED_UNAVAILABLE_AT_START: i32 = 4;
    pub const KILLED_BY_SAFETY_LAYER: i32 = 5;
}

/// Operator-facing control surface (spec §6.5).
pub trait ControlSurface: Send + Sync {
    fn status(&self) -> StatusReport;
    fn kill_switch_set(&self);
    fn kill_switch_clear(&self);
    fn emergency_reset_adaptive(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec() {
        assert_eq!(exit_code::CLEAN, 0);
        assert_eq!(exit_code::CONFIG_ERROR, 2);
        assert_eq!(exit_code::BROKER_AUTH_ERROR, 3);
        assert_eq!(exit_code::FEED_UNAVAILABLE_AT_START, 4);
        assert_eq!(exit_code::KILLED_BY_SAFETY_LAYER, 5);
    }
}
