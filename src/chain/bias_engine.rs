//! Bias computation (spec §4.2): weighted blend of OI, volume, Greeks, and
//! price-action factors, with hysteresis on direction changes.

use crate::config::ChainConfig;
use crate::model::{BiasFactors, BiasState, Chain, Confidence, Direction};
use std::collections::VecDeque;

/// Rolling OI-per-strike history used to compute the 3-snapshot OI delta.
#[derive(Debug, Clone, Default)]
struct OiHistory {
    below_atm_put_oi: VecDeque<i64>,
    above_atm_call_oi: VecDeque<i64>,
}

const OI_HISTORY_LEN: usize = 3;

/// Stateful bias engine: applies the direction/confidence hysteresis from
/// spec §4.2 (2 consecutive updates to leave NEUTRAL, 3 to flip BULL<->BEAR).
pub struct BiasEngine {
    cfg: ChainConfig,
    oi_history: OiHistory,
    price_history: VecDeque<f64>,
    current: BiasState,
    pending_direction: Option<Direction>,
    pending_count: u32,
}

impl BiasEngine {
    pub fn new(cfg: ChainConfig) -> Self {
        Self {
            cfg,
            oi_history: OiHistory::default(),
            price_history: VecDeque::new(),
            current: BiasState::neutral(),
            pending_direction: None,
            pending_count: 0,
        }
    }

    pub fn current(&self) -> BiasState {
        self.current
    }

    fn oi_factor(&mut self, chain: &Chain) -> f64 {
        let below_put_oi: i64 = chain
            .rows
            .iter()
            .filter(|r| r.strike < chain.atm_strike)
            .filter_map(|r| r.pe_tick.map(|t| t.open_interest as i64))
            .sum();
        let above_call_oi: i64 = chain
            .rows
            .iter()
            .filter(|r| r.strike > chain.atm_strike)
            .filter_map(|r| r.ce_tick.map(|t| t.open_interest as i64))
            .sum();

        if self.oi_history.below_atm_put_oi.len() == OI_HISTORY_LEN {
            self.oi_history.below_atm_put_oi.pop_front();
            self.oi_history.above_atm_call_oi.pop_front();
        }
        self.oi_history.below_atm_put_oi.push_back(below_put_oi);
        self.oi_history.above_atm_call_oi.push_back(above_call_oi);

        let oldest_put = *self.oi_history.below_atm_put_oi.front().unwrap_or(&below_put_oi);
        let oldest_call = *self.oi_history.above_atm_call_oi.front().unwrap_or(&above_call_oi);
        let delta = (below_put_oi - oldest_put) - (above_call_oi - oldest_call);
        let scale = (below_put_oi.abs() + above_call_oi.abs()).max(1) as f64;
        normalize_signed(delta as f64 / scale)
    }

    fn volume_factor(&self, chain: &Chain) -> f64 {
        let rows = chain.rows_near_atm(2);
        let ce_vol: u64 = rows.iter().filter_map(|r| r.ce_tick.map(|t| t.volume)).sum();
        let pe_vol: u64 = rows.iter().filter_map(|r| r.pe_tick.map(|t| t.volume)).sum();
        let total = (ce_vol + pe_vol).max(1) as f64;
        (ce_vol as f64 / total).clamp(0.0, 1.0)
    }

    fn price_action_factor(&mut self, spot: f64) -> f64 {
        self.price_history.push_back(spot);
        if self.price_history.len() > self.cfg.price_action_lookback + 1 {
            self.price_history.pop_front();
        }
        if self.price_history.len() < 2 {
            return 0.5;
        }
        let returns: Vec<f64> = self.price_history.iter().zip(self.price_history.iter().skip(1)).map(|(a, b)| b - a).collect();
        let net: f64 = returns.iter().sum();
        if net.abs() < self.cfg.price_action_deadband * spot {
            0.5
        } else {
            normalize_signed(net / (spot * self.cfg.price_action_deadband * 10.0))
        }
    }

    /// Recompute bias for the latest chain + Greeks `direction_bias` signal,
    /// applying hysteresis before committing the new direction.
    pub fn update(&mut self, chain: &Chain, greeks_direction_bias: f64) -> BiasState {
        let factors = BiasFactors {
            oi: self.oi_factor(chain),
            volume: self.volume_factor(chain),
            greeks: greeks_direction_bias.clamp(0.0, 1.0),
            price_action: self.price_action_factor(chain.spot),
        };
        let w = &self.cfg.bias_weights;
        let score = w.oi * factors.oi + w.volume * factors.volume + w.greeks * factors.greeks + w.price_action * factors.price_action;

        let raw_direction = if score > 0.55 {
            Direction::Bullish
        } else if score < 0.45 {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        let strength = (score - 0.5).abs() * 2.0;
        let confidence = if strength < 0.2 {
            Confidence::Weak
        } else if strength < 0.4 {
            Confidence::Medium
        } else {
            Confidence::Strong
        };

        let direction = self.apply_hysteresis(raw_direction);

        self.current = BiasState { direction, strength: strength.clamp(0.0, 1.0), confidence, factors };
        self.current
    }

    fn apply_hysteresis(&mut self, raw_direction: Direction) -> Direction {
        if raw_direction == self.current.direction {
            self.pending_direction = None;
            self.pending_count = 0;
            return self.current.direction;
        }

        if self.pending_direction == Some(raw_direction) {
            self.pending_count += 1;
        } else {
            self.pending_direction = Some(raw_direction);
            self.pending_count = 1;
        }

        let required = if self.current.direction == Direction::Neutral {
            self.cfg.bias_confirm_neutral_updates
        } else {
            self.cfg.bias_confirm_flip_updates
        };

        if self.pending_count >= required {
            self.pending_direction = None;
            self.pending_count = 0;
            raw_direction
        } else {
            self.current.direction
        }
    }
}

/// Map a signed ratio (roughly in [-1, 1]) into [0, 1] with 0.5 as neutral.
fn normalize_signed(x: f64) -> f64 {
    (x.clamp(-1.0, 1.0) + 1.0) / 2.0
}
