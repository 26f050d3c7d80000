//! The ordered quality gates (spec §4.3). Each gate is a pure function of
//! its inputs; the entry engine folds them in order and stops at the first
//! failure, per the design notes' "exception-for-control-flow becomes
//! explicit Result/enum" rule — nothing here throws.

use crate::greeks::HealthStatus;
use crate::model::{BiasState, Confidence, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateFailureReason {
    Freshness,
    SessionWindow,
    BiasUnconfirmed,
    AdaptiveBlocked,
    RiskBlocked,
    FakeMoveLocked,
    SpreadTooWide,
    NoCandidateStrike,
    QualityTooLow,
}

pub fn gate_freshness(tick_age_secs: f64, max_age_secs: f64, health: HealthStatus) -> Result<(), GateFailureReason> {
    if tick_age_secs >= max_age_secs {
        return Err(GateFailureReason::Freshness);
    }
    if !matches!(health, HealthStatus::Healthy | HealthStatus::Degraded) {
        return Err(GateFailureReason::Freshness);
    }
    Ok(())
}

pub fn gate_session_window(tradable: bool) -> Result<(), GateFailureReason> {
    if tradable { Ok(()) } else { Err(GateFailureReason::SessionWindow) }
}

pub fn gate_bias_confirmation(bias: &BiasState) -> Result<(), GateFailureReason> {
    if bias.direction != Direction::Neutral && bias.confidence >= Confidence::Medium {
        Ok(())
    } else {
        Err(GateFailureReason::BiasUnconfirmed)
    }
}

pub fn gate_adaptive_pre(adaptive_allows: bool) -> Result<(), GateFailureReason> {
    if adaptive_allows { Ok(()) } else { Err(GateFailureReason::AdaptiveBlocked) }
}

pub fn gate_risk_pre(risk_has_capacity: bool) -> Result<(), GateFailureReason> {
    if risk_has_capacity { Ok(()) } else { Err(GateFailureReason::RiskBlocked) }
}

pub fn gate_structural(fake_move_locked: bool, spread_pct_of_mid: f64, max_spread_pct: f64) -> Result<(), GateFailureReason> {
    if fake_move_locked {
        return Err(GateFailureReason::FakeMoveLocked);
    }
    if spread_pct_of_mid > max_spread_pct {
        return Err(GateFailureReason::SpreadTooWide);
    }
    Ok(())
}
