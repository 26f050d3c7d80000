//! Priority arbitration across the eight detectors (spec §4.4): all run
//! every tick, and the highest-priority firing signal wins, ties broken by
//! confidence, then by quantity fraction (prefer the larger exposure cut).

use super::detectors::ExitSignal;

pub fn arbitrate(candidates: &[Option<ExitSignal>]) -> Option<ExitSignal> {
    candidates
        .iter()
        .filter_map(|c| *c)
        .fold(None, |best, cur| match best {
            None => Some(cur),
            Some(b) => Some(pick_winner(b, cur)),
        })
}

fn pick_winner(a: ExitSignal, b: ExitSignal) -> ExitSignal {
    if (a.priority - b.priority).abs() > 1e-9 {
        return if a.priority > b.priority { a } else { b };
    }
    if (a.confidence - b.confidence).abs() > 1e-9 {
        return if a.confidence > b.confidence { a } else { b };
    }
    if a.qty_fraction >= b.qty_fraction { a } else { b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExitTriggerKind;

    fn sig(kind: ExitTriggerKind, confidence: f64, qty_fraction: f64) -> ExitSignal {
        ExitSignal { kind, priority: kind.base_priority(), confidence, qty_fraction }
    }

    #[test]
    fn higher_priority_wins_regardless_of_confidence() {
        let low_priority_high_conf = sig(ExitTriggerKind::HardSl, 1.0, 1.0);
        let high_priority_low_conf = sig(ExitTriggerKind::TimeForced, 0.5, 1.0);
        let winner = arbitrate(&[Some(low_priority_high_conf), Some(high_priority_low_conf)]).unwrap();
        assert_eq!(winner.kind, ExitTriggerKind::TimeForced);
    }

    #[test]
    fn no_signals_yields_none() {
        assert!(arbitrate(&[None, None, None]).is_none());
    }

    #[test]
    fn tie_on_priority_breaks_on_confidence() {
        // Two Reversal-kind signals can't occur together in practice, but
        // arbitration must still resolve a priority tie deterministically.
        let a = sig(ExitTriggerKind::Reversal, 0.8, 1.0);
        let b = sig(ExitTriggerKind::Reversal, 0.9, 1.0);
        let winner = arbitrate(&[Some(a), Some(b)]).unwrap();
        assert!((winner.confidence - 0.9).abs() < 1e-9);
    }
}
