//! Safety guard (spec §4.6): the gate every proposed weight change must
//! clear before `WeightAdjuster::apply` is ever called — no intraday
//! mutation, a minimum spacing between applications, and a shadow test.

use chrono::{DateTime, Utc};

use crate::config::AdaptiveConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    IntradayMutationForbidden,
    TooSoonSinceLastApplication,
    ShadowTestFailed,
    LowConfidenceProposal,
}

/// Result of running a proposed weight change against historical journal
/// entries before it is allowed to affect live decisions.
#[derive(Debug, Clone, Copy)]
pub struct ShadowTestResult {
    pub historical_pnl_with_current_weight: f64,
    pub historical_pnl_with_proposed_weight: f64,
}

impl ShadowTestResult {
    fn passed(&self) -> bool {
        self.historical_pnl_with_proposed_weight >= self.historical_pnl_with_current_weight
    }
}

pub struct SafetyGuard {
    last_applied_at: Option<DateTime<Utc>>,
}

impl SafetyGuard {
    pub fn new() -> Self {
        Self { last_applied_at: None }
    }

    /// Only end-of-day learning may call through the guard; intraday
    /// callers get `IntradayMutationForbidden` unconditionally.
    pub fn check(
        &self,
        cfg: &AdaptiveConfig,
        is_end_of_day: bool,
        now: DateTime<Utc>,
        shadow: &ShadowTestResult,
        proposal_confidence_ok: bool,
    ) -> Result<(), GuardRejection> {
        if !is_end_of_day {
            return Err(GuardRejection::IntradayMutationForbidden);
        }
        if !proposal_confidence_ok {
            return Err(GuardRejection::LowConfidenceProposal);
        }
        if let Some(last) = self.last_applied_at {
            let hours_since = (now - last).num_hours();
            if hours_since < cfg.min_hours_between_applications {
                return Err(GuardRejection::TooSoonSinceLastApplication);
            }
        }
        if !shadow.passed() {
            return Err(GuardRejection::ShadowTestFailed);
        }
        Ok(())
    }

    pub fn record_applied(&mut self, now: DateTime<Utc>) {
        self.last_applied_at = Some(now);
    }

    /// Restores baseline: clears the application cooldown so the next
    /// end-of-day cycle can re-learn from scratch.
    pub fn emergency_reset(&mut self) {
        self.last_applied_at = None;
    }
}

impl Default for SafetyGuard {
    fn default() -> Self {
        Self::new()
    }
}
