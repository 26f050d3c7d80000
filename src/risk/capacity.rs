//! Capacity check (spec §4.5): the ordered set of conditions a new trade
//! must satisfy, all evaluated against the risk layer's single-writer state.

use crate::config::RiskConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityBlock {
    DailyLossLimit,
    ConsecutiveLosses,
    Cooldown,
    MaxConcurrent,
    Margin,
}

pub struct CapacityInputs {
    pub daily_realized_pnl: f64,
    pub consecutive_losses: u32,
    pub in_cooldown: bool,
    pub open_positions: usize,
    pub available_margin: f64,
    pub required_margin: f64,
}

pub fn check_capacity(cfg: &RiskConfig, inputs: &CapacityInputs) -> Result<(), CapacityBlock> {
    if inputs.daily_realized_pnl <= -cfg.daily_loss_limit {
        return Err(CapacityBlock::DailyLossLimit);
    }
    if inputs.consecutive_losses >= cfg.max_consecutive_losses {
        return Err(CapacityBlock::ConsecutiveLosses);
    }
    if inputs.in_cooldown {
        return Err(CapacityBlock::Cooldown);
    }
    if inputs.open_positions >= cfg.max_concurrent {
        return Err(CapacityBlock::MaxConcurrent);
    }
    if inputs.available_margin < inputs.required_margin {
        return Err(CapacityBlock::Margin);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_inputs() -> CapacityInputs {
        CapacityInputs {
            daily_realized_pnl: 0.0,
            consecutive_losses: 0,
            in_cooldown: false,
            open_positions: 0,
            available_margin: 100_000.0,
            required_margin: 10_000.0,
        }
    }

    #[test]
    fn passes_when_all_conditions_hold() {
        let cfg = RiskConfig::default();
        assert!(check_capacity(&cfg, &ok_inputs()).is_ok());
    }

    #[test]
    fn daily_loss_limit_blocks_at_threshold() {
        let cfg = RiskConfig::default();
        let mut inputs = ok_inputs();
        inputs.daily_realized_pnl = -cfg.daily_loss_limit;
        assert_eq!(check_capacity(&cfg, &inputs), Err(CapacityBlock::DailyLossLimit));
    }

    #[test]
    fn max_concurrent_blocks_second_position() {
        let cfg = RiskConfig::default(); // max_concurrent defaults to 1
        let mut inputs = ok_inputs();
        inputs.open_positions = 1;
        assert_eq!(check_capacity(&cfg, &inputs), Err(CapacityBlock::MaxConcurrent));
    }

    #[test]
    fn checks_are_ordered_loss_limit_first() {
        let cfg = RiskConfig::default();
        let mut inputs = ok_inputs();
        inputs.daily_realized_pnl = -cfg.daily_loss_limit;
        inputs.consecutive_losses = cfg.max_consecutive_losses;
        assert_eq!(check_capacity(&cfg, &inputs), Err(CapacityBlock::DailyLossLimit));
    }
}
