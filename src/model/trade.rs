//! Trade and ExitEvent (spec §3). Lifecycle: `Pending -> Open ->
//! (PartialExit)* -> Closed`, owned exclusively by the orchestrator while
//! Open (spec §3, §5).

use super::{GreeksSnapshot, Instrument};
use serde::{Deserialize, Serialize};

pub type TradeId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Pending,
    Open,
    PartialExitPending,
    PartialExitDone,
    ClosePending,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitTriggerKind {
    TimeForced,
    ThetaBomb,
    Reversal,
    Exhaustion,
    PartialExit,
    TrailingSl,
    HardSl,
    ForcedMarketExit,
    ForcedFlat,
    NoAction,
}

impl ExitTriggerKind {
    /// Base priority weight per spec §4.4, used by arbitration as the primary
    /// sort key (ties broken by confidence, then by exposure reduced).
    pub fn base_priority(self) -> f64 {
        match self {
            ExitTriggerKind::TimeForced => 0.99,
            ExitTriggerKind::ForcedFlat => 0.96,
            ExitTriggerKind::ThetaBomb => 0.90,
            ExitTriggerKind::TrailingSl => 0.85,
            ExitTriggerKind::PartialExit => 0.80,
            ExitTriggerKind::Exhaustion => 0.70,
            ExitTriggerKind::Reversal => 0.75,
            ExitTriggerKind::HardSl => 0.65,
            ExitTriggerKind::ForcedMarketExit => 0.60,
            ExitTriggerKind::NoAction => 0.0,
        }
    }
}

/// An append-only record of one exit (partial or final).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitEvent {
    pub monotonic_millis: u64,
    pub trigger: ExitTriggerKind,
    pub confidence: f64,
    pub quantity: u64,
    pub price: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectiveLevels {
    pub initial_stop_loss: f64,
    pub trailing_stop_loss: Option<f64>,
    pub targets: Vec<f64>,
    pub time_stop_monotonic_millis: u64,
}

/// A position under active management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub instrument: Instrument,
    pub side: Side,
    pub quantity_total: u64,
    pub quantity_exited: u64,
    pub entry_price: f64,
    pub entry_greeks: GreeksSnapshot,
    pub entry_monotonic_millis: u64,
    pub protective: ProtectiveLevels,
    pub exits: Vec<ExitEvent>,
    pub status: TradeStatus,
    pub partial_exit_taken: bool,
    /// Set true if an exit order failed through every escalation path
    /// (spec §4.4 failure semantics); blocks new entries on this underlying
    /// until cleared by an operator.
    pub naked_risk: bool,
}

impl Trade {
    pub fn quantity_remaining(&self) -> u64 {
        self.quantity_total - self.quantity_exited
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.status, TradeStatus::Closed)
    }

    /// Apply an exit event, enforcing monotonic state transitions (spec §5:
    /// "no event may be applied to a Closed trade"). Returns an error and
    /// drops the event if the trade is already Closed, or if the exited
    /// quantity would exceed the total (spec §8 property 2).
    pub fn apply_exit(&mut self, event: ExitEvent) -> Result<(), crate::error::EngineError> {
        if matches!(self.status, TradeStatus::Closed) {
            return Err(crate::error::EngineError::State(format!(
                "trade {} is already closed, dropping exit event",
                self.id
            )));
        }
        if self.quantity_exited + event.quantity > self.quantity_total {
            return Err(crate::error::EngineError::State(format!(
                "trade {} exit would exceed total quantity",
                self.id
            )));
        }
        self.quantity_exited += event.quantity;
        let remaining = self.quantity_remaining();
        self.exits.push(event);
        self.status = if remaining == 0 { TradeStatus::Closed } else { TradeStatus::PartialExitDone };
        Ok(())
    }

    pub fn realized_pnl(&self) -> f64 {
        let sign = match self.side {
            Side::Long => 1.0,
            Side::Short => -1.0,
        };
        self.exits
            .iter()
            .map(|e| sign * (e.price - self.entry_price) * e.quantity as f64)
            .sum()
    }
}
