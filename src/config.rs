//! Engine configuration: every tunable named in the spec, with its default.
//! Layered loading (defaults → file → env) via the `config` crate, matching
//! `options-engine`'s startup-time validation style — load once, validate
//! once, fail fast with `anyhow::Context`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Weights for the four bias factors (spec §4.2). Two weightings appear
/// across source material (0.3/0.2/0.3/0.2 vs 0.4/0.3/0.3/0.x); Open
/// Question #1 resolves this as a config default, not a hardcoded constant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BiasWeights {
    pub oi: f64,
    pub volume: f64,
    pub greeks: f64,
    pub price_action: f64,
}

impl Default for BiasWeights {
    fn default() -> Self {
        Self { oi: 0.3, volume: 0.2, greeks: 0.3, price_action: 0.2 }
    }
}

/// Partial-exit ladder (spec §4.4 detector 5). Open Question #2: default is
/// a single 60/40 split; alternative ladders are expressible as more entries
/// summing to 1.0 but this crate locks the default to one ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartialExitLadder {
    /// Fraction of remaining quantity taken at each rung, summing to <= 1.0.
    pub rungs: Vec<f64>,
}

impl Default for PartialExitLadder {
    fn default() -> Self {
        Self { rungs: vec![0.6] }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GreeksConfig {
    pub risk_free_rate: f64,
    pub iv_min: f64,
    pub iv_max: f64,
    pub broker_iv_min: f64,
    pub broker_iv_max: f64,
    pub broker_iv_max_age_secs: f64,
    pub inversion_tolerance: f64,
    pub inversion_max_iterations: u32,
    pub default_iv: f64,
    pub ring_buffer_len: usize,
    pub min_snapshot_gap_millis: u64,
    pub fake_move_delta_threshold: f64,
    pub fake_move_lock_secs: u64,
    pub theta_trap_accel_pct: f64,
    pub theta_trap_window_secs: u64,
    pub zone_strike_span: i32,
    pub dominance_deadband_pct: f64,
    pub stale_snapshot_secs: f64,
    pub frozen_snapshot_pct: f64,
    pub iv_spike_abs_pct: f64,
    pub inversion_failure_pct: f64,
    pub min_valid_strikes: usize,
}

impl Default for GreeksConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.06,
            iv_min: 0.01,
            iv_max: 3.0,
            broker_iv_min: 0.05,
            broker_iv_max: 2.5,
            broker_iv_max_age_secs: 2.0,
            inversion_tolerance: 0.05,
            inversion_max_iterations: 64,
            default_iv: 0.25,
            ring_buffer_len: 128,
            min_snapshot_gap_millis: 250,
            fake_move_delta_threshold: 0.02,
            fake_move_lock_secs: 60,
            theta_trap_accel_pct: 0.20,
            theta_trap_window_secs: 60,
            zone_strike_span: 5,
            dominance_deadband_pct: 0.05,
            stale_snapshot_secs: 60.0,
            frozen_snapshot_pct: 0.70,
            iv_spike_abs_pct: 0.20,
            inversion_failure_pct: 0.30,
            min_valid_strikes: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainConfig {
    pub atm_window: i32,
    pub max_spread_pct_of_mid: f64,
    pub bias_weights: BiasWeights,
    pub bias_confirm_neutral_updates: u32,
    pub bias_confirm_flip_updates: u32,
    pub price_action_lookback: usize,
    pub price_action_deadband: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            atm_window: 5,
            max_spread_pct_of_mid: 0.20,
            bias_weights: BiasWeights::default(),
            bias_confirm_neutral_updates: 2,
            bias_confirm_flip_updates: 3,
            price_action_lookback: 5,
            price_action_deadband: 0.0005,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryConfig {
    pub max_tick_age_secs: f64,
    pub strike_window: i32,
    pub delta_band_low: f64,
    pub delta_band_high: f64,
    pub iv_fit_center_low: f64,
    pub iv_fit_center_high: f64,
    pub quality_threshold: f64,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            max_tick_age_secs: 10.0,
            strike_window: 3,
            delta_band_low: 0.2,
            delta_band_high: 0.7,
            iv_fit_center_low: 0.20,
            iv_fit_center_high: 0.30,
            quality_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExitConfig {
    pub max_hold_secs: u64,
    pub theta_accel_per_min: f64,
    pub iv_crush_pct: f64,
    pub theta_time_cap_secs: u64,
    pub reversal_oi_unwind_pct: f64,
    pub reversal_score_threshold: f64,
    pub exhaustion_gamma_drop_pct: f64,
    pub exhaustion_volume_multiple: f64,
    pub partial_profit_threshold_pct: f64,
    pub partial_exit_ladder: PartialExitLadder,
    pub trail_activation_pct: f64,
    pub hard_sl_pct: f64,
    pub broker_retry_window_secs: u64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            max_hold_secs: 600,
            theta_accel_per_min: -0.05,
            iv_crush_pct: 0.10,
            theta_time_cap_secs: 600,
            reversal_oi_unwind_pct: 0.05,
            reversal_score_threshold: 0.7,
            exhaustion_gamma_drop_pct: 0.60,
            exhaustion_volume_multiple: 2.0,
            partial_profit_threshold_pct: 0.008,
            partial_exit_ladder: PartialExitLadder::default(),
            trail_activation_pct: 0.005,
            hard_sl_pct: 0.02,
            broker_retry_window_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskConfig {
    pub daily_loss_limit: f64,
    pub max_consecutive_losses: u32,
    pub max_concurrent: usize,
    pub base_qty: u64,
    pub min_qty: u64,
    pub max_qty: u64,
    pub loss_cooldown_secs: u64,
    pub win_cooldown_secs: u64,
    pub extended_cooldown_secs: u64,
    pub high_vol_cooldown_multiplier: f64,
    pub max_staleness_secs: f64,
    pub forced_flat_staleness_secs: f64,
    pub flash_crash_move_pct: f64,
    pub flash_crash_window_secs: u64,
    pub flash_crash_pause_secs: u64,
    pub api_failure_streak_threshold: u32,
    pub kelly_fraction_cap: f64,
    pub kelly_multiplier: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            daily_loss_limit: 2000.0,
            max_consecutive_losses: 5,
            max_concurrent: 1,
            base_qty: 50,
            min_qty: 50,
            max_qty: 200,
            loss_cooldown_secs: 60,
            win_cooldown_secs: 15,
            extended_cooldown_secs: 180,
            high_vol_cooldown_multiplier: 1.5,
            max_staleness_secs: 10.0,
            forced_flat_staleness_secs: 30.0,
            flash_crash_move_pct: 0.05,
            flash_crash_window_secs: 60,
            flash_crash_pause_secs: 900,
            api_failure_streak_threshold: 3,
            kelly_fraction_cap: 0.2,
            kelly_multiplier: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdaptiveConfig {
    pub min_sample_size: u32,
    pub amplify_win_rate: f64,
    pub restrict_win_rate: f64,
    pub amplify_weight_cap: f64,
    pub restrict_weight_floor: f64,
    pub max_weight_delta_per_proposal: f64,
    pub max_applied_proposals_per_day: u32,
    pub block_min_losses: u32,
    pub block_high_hours: i64,
    pub block_critical_hours: i64,
    pub min_hours_between_applications: i64,
    pub weight_min: f64,
    pub weight_max: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 20,
            amplify_win_rate: 0.65,
            restrict_win_rate: 0.40,
            amplify_weight_cap: 1.3,
            restrict_weight_floor: 0.5,
            max_weight_delta_per_proposal: 0.5,
            max_applied_proposals_per_day: 5,
            block_min_losses: 6,
            block_high_hours: 72,
            block_critical_hours: 168,
            min_hours_between_applications: 24,
            weight_min: 0.0,
            weight_max: 1.3,
        }
    }
}

/// Top-level engine configuration: the union of every subsystem config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EngineConfig {
    pub greeks: GreeksConfig,
    pub chain: ChainConfig,
    pub entry: EntryConfig,
    pub exit: ExitConfig,
    pub risk: RiskConfig,
    pub adaptive: AdaptiveConfig,
}

impl EngineConfig {
    /// Load defaults layered with an optional file and environment
    /// overrides (`SCALPER_` prefix), matching `options-engine`'s use of the
    /// `config` crate. Returns a validated config or a descriptive error.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&EngineConfig::default()).context("serializing defaults")?);
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("SCALPER").separator("__"));
        let built = builder.build().context("building layered configuration")?;
        let cfg: EngineConfig = built.try_deserialize().context("deserializing engine configuration")?;
        cfg.validate().context("validating engine configuration")?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.chain.bias_weights;
        let sum = w.oi + w.volume + w.greeks + w.price_action;
        anyhow::ensure!(
            (sum - 1.0).abs() < 1e-6,
            "bias weights must sum to 1.0, got {sum}"
        );
        anyhow::ensure!(self.greeks.iv_min > 0.0 && self.greeks.iv_min < self.greeks.iv_max, "invalid iv clamp range");
        anyhow::ensure!(self.risk.min_qty <= self.risk.max_qty, "min_qty must be <= max_qty");
        anyhow::ensure!(self.risk.max_concurrent >= 1, "max_concurrent must be >= 1");
        anyhow::ensure!(
            self.exit.partial_exit_ladder.rungs.iter().sum::<f64>() <= 1.0 + 1e-9,
            "partial exit ladder rungs must not exceed 1.0 in total"
        );
        Ok(())
    }
}
