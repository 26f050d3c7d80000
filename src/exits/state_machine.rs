//! Trade lifecycle transitions driven by exit signals (spec §3, §4.4): the
//! Pending-state duplicate-emission guard and the broker-failure escalation
//! ladder (retry once -> forced market exit -> naked-risk halt).

use rustc_hash::FxHashMap;

use super::detectors::ExitSignal;
use crate::model::{ExitEvent, ExitTriggerKind, Trade, TradeId, TradeStatus};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrokerOutcome {
    Filled { price: f64 },
    Failed,
}

/// What the orchestrator must do next after the state machine has reacted
/// to a broker outcome or a fresh signal.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitAction {
    /// Submit an order for this trade's remaining-or-partial quantity.
    Submit { trade_id: TradeId, quantity: u64, trigger: ExitTriggerKind },
    /// No action: either nothing fired, or an exit is already in flight for
    /// this trade (duplicate-emission guard).
    None,
    /// Every escalation path failed; halt trading on this instrument until
    /// an operator clears `naked_risk`.
    NakedRiskHalt { trade_id: TradeId },
}

#[derive(Debug, Clone, Copy)]
struct PendingAttempt {
    trigger: ExitTriggerKind,
    quantity: u64,
    first_attempt_monotonic_millis: u64,
    retried: bool,
    escalated: bool,
}

/// Tracks in-flight exit attempts per trade so a re-fired signal for a trade
/// already submitting an exit is dropped, not resubmitted (spec §4.4: "the
/// Pending state guards against duplicate emission while a broker round
/// trip is outstanding").
#[derive(Debug, Default)]
pub struct ExitStateMachine {
    attempts: FxHashMap<TradeId, PendingAttempt>,
}

impl ExitStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// React to a fresh arbitration winner for `trade`. Transitions the
    /// trade into the appropriate Pending status and returns the order to
    /// submit, or `ExitAction::None` if this trade already has an exit in
    /// flight.
    pub fn on_signal(&mut self, trade: &mut Trade, signal: ExitSignal, now_monotonic_millis: u64) -> ExitAction {
        if matches!(trade.status, TradeStatus::PartialExitPending | TradeStatus::ClosePending) {
            return ExitAction::None;
        }
        if self.attempts.contains_key(&trade.id) {
            return ExitAction::None;
        }

        let quantity = if signal.qty_fraction >= 1.0 {
            trade.quantity_remaining()
        } else {
            ((trade.quantity_remaining() as f64) * signal.qty_fraction).round() as u64
        };
        if quantity == 0 {
            return ExitAction::None;
        }

        trade.status = if signal.qty_fraction >= 1.0 { TradeStatus::ClosePending } else { TradeStatus::PartialExitPending };
        self.attempts.insert(
            trade.id,
            PendingAttempt {
                trigger: signal.kind,
                quantity,
                first_attempt_monotonic_millis: now_monotonic_millis,
                retried: false,
                escalated: false,
            },
        );
        ExitAction::Submit { trade_id: trade.id, quantity, trigger: signal.kind }
    }

    /// React to a broker response for `trade`'s in-flight attempt. On
    /// success, applies the fill to the trade and clears the in-flight
    /// record. On failure, walks the escalation ladder: retry once within
    /// `retry_window_secs`, then escalate to a full forced market exit, then
    /// flag `naked_risk` and signal a halt.
    pub fn on_broker_outcome(
        &mut self,
        trade: &mut Trade,
        outcome: BrokerOutcome,
        now_monotonic_millis: u64,
        retry_window_secs: u64,
    ) -> ExitAction {
        let Some(attempt) = self.attempts.get(&trade.id).copied() else {
            return ExitAction::None;
        };

        match outcome {
            BrokerOutcome::Filled { price } => {
                self.attempts.remove(&trade.id);
                let was_partial = matches!(trade.status, TradeStatus::PartialExitPending);
                let _ = trade.apply_exit(ExitEvent {
                    monotonic_millis: now_monotonic_millis,
                    trigger: attempt.trigger,
                    confidence: 1.0,
                    quantity: attempt.quantity,
                    price,
                    reason: format!("{:?} filled", attempt.trigger),
                });
                if was_partial {
                    trade.partial_exit_taken = true;
                }
                ExitAction::None
            }
            BrokerOutcome::Failed => {
                let within_retry_window =
                    now_monotonic_millis.saturating_sub(attempt.first_attempt_monotonic_millis) <= retry_window_secs * 1000;

                if !attempt.retried && within_retry_window {
                    self.attempts.insert(trade.id, PendingAttempt { retried: true, ..attempt });
                    return ExitAction::Submit { trade_id: trade.id, quantity: attempt.quantity, trigger: attempt.trigger };
                }
                if !attempt.escalated {
                    let remaining = trade.quantity_remaining();
                    self.attempts.insert(
                        trade.id,
                        PendingAttempt {
                            trigger: ExitTriggerKind::ForcedMarketExit,
                            quantity: remaining,
                            escalated: true,
                            retried: true,
                            first_attempt_monotonic_millis: now_monotonic_millis,
                        },
                    );
                    return ExitAction::Submit { trade_id: trade.id, quantity: remaining, trigger: ExitTriggerKind::ForcedMarketExit };
                }

                self.attempts.remove(&trade.id);
                trade.naked_risk = true;
                ExitAction::NakedRiskHalt { trade_id: trade.id }
            }
        }
    }

    pub fn has_pending(&self, trade_id: TradeId) -> bool {
        self.attempts.contains_key(&trade_id)
    }
}
