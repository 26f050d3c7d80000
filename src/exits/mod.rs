//! Exit orchestrator (spec §4.4): eight parallel detectors, priority
//! arbitration, and the trade state machine that turns a winning signal into
//! a broker order while guarding against duplicate emission.

pub mod arbitration;
pub mod detectors;
pub mod state_machine;

pub use arbitration::arbitrate;
pub use detectors::{DetectorContext, ExitSignal};
pub use state_machine::{BrokerOutcome, ExitAction, ExitStateMachine};

use crate::config::ExitConfig;
use crate::model::Trade;

/// Runs every detector against one trade's context and returns the
/// arbitrated winner, if any. The eight detectors are independent pure
/// functions; this is the only place their outputs are compared.
pub fn evaluate_exit(
    cfg: &ExitConfig,
    trade: &Trade,
    ctx: &DetectorContext,
    base_trail_distance: f64,
    current_delta: f64,
) -> Option<ExitSignal> {
    let candidates = [
        detectors::time_forced(cfg, trade, ctx),
        detectors::theta_bomb(cfg, trade, ctx),
        detectors::reversal(cfg, ctx),
        detectors::exhaustion(cfg, ctx),
        detectors::partial_exit(cfg, trade, ctx),
        detectors::trailing_sl(cfg, trade, ctx, base_trail_distance, current_delta),
        detectors::hard_sl(trade, ctx),
    ];
    arbitration::arbitrate(&candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greeks::Dominance;
    use crate::model::{ExitTriggerKind, GreeksSnapshot, GreeksSource, Instrument, OptionType, ProtectiveLevels, Side, TradeStatus, Underlying};

    fn base_trade() -> Trade {
        Trade {
            id: 1,
            instrument: Instrument::new(Underlying::Nifty, 0, 20000, OptionType::Ce),
            side: Side::Long,
            quantity_total: 50,
            quantity_exited: 0,
            entry_price: 100.0,
            entry_greeks: GreeksSnapshot { delta: 0.5, gamma: 0.01, theta: -5.0, vega: 5.0, iv: 0.2, source: GreeksSource::Broker, computed_at_millis: 0 },
            entry_monotonic_millis: 0,
            protective: ProtectiveLevels { initial_stop_loss: 98.0, trailing_stop_loss: None, targets: vec![], time_stop_monotonic_millis: 600_000 },
            exits: vec![],
            status: TradeStatus::Open,
            partial_exit_taken: false,
            naked_risk: false,
        }
    }

    fn base_ctx() -> DetectorContext {
        DetectorContext {
            now_monotonic_millis: 10_000,
            current_price: 105.0,
            current_gamma: 0.01,
            peak_gamma_since_entry: 0.01,
            current_volume: 100,
            rolling_mean_volume: 100,
            delta_change_since_last: 0.0,
            price_change_since_last: 0.0,
            theta_accel_per_min: 0.0,
            iv_at_entry: 0.2,
            iv_now: 0.2,
            oi_unwind_pct_3_snapshots: 0.0,
            dominance_now: Dominance::Balanced,
            dominance_at_entry: Dominance::Balanced,
            opposite_side_oi_build_pct: 0.0,
            seconds_to_next_session_cutoff: None,
            partial_exit_already_taken: false,
        }
    }

    #[test]
    fn exhaustion_outranks_hard_sl_when_both_fire() {
        // Spec priority order places EXHAUSTION (0.70-0.90) above HARD_SL;
        // arbitration must prefer it even though the hard stop also fired.
        let cfg = ExitConfig::default();
        let trade = base_trade();
        let mut ctx = base_ctx();
        ctx.current_price = 97.0; // breaches hard SL
        ctx.peak_gamma_since_entry = 0.02;
        ctx.current_gamma = 0.005; // also triggers exhaustion's gamma collapse
        let winner = evaluate_exit(&cfg, &trade, &ctx, 2.0, 0.5).unwrap();
        assert_eq!(winner.kind, ExitTriggerKind::Exhaustion);
    }

    #[test]
    fn no_detector_fires_on_quiet_market() {
        let cfg = ExitConfig::default();
        let trade = base_trade();
        let ctx = base_ctx();
        assert!(evaluate_exit(&cfg, &trade, &ctx, 2.0, 0.5).is_none());
    }
}
