//! IV inversion and source-priority selection (spec §4.1).
//!
//! Inversion uses bisection rather than the teacher's Newton-Raphson
//! (`options-engine`'s `BlackScholes::implied_volatility`), because the spec
//! fixes the method and the convergence contract explicitly: bisect over
//! `sigma in [0.01, 3.0]`, stop once `|price - ltp| <= tolerance` or after a
//! bounded iteration count, and never fail — fall through to the next
//! source instead of propagating an error.

use super::black_scholes::BlackScholes;
use crate::config::GreeksConfig;
use crate::model::{GreeksSource, OptionType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IvResult {
    pub iv: f64,
    pub converged: bool,
}

/// Bisection search for the IV whose BS price matches `market_price`, within
/// `tolerance`, over at most `max_iterations` steps. Always returns a value;
/// `converged = false` signals the caller to fall through to the next IV
/// source rather than trust this estimate.
pub fn invert_bisection(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    time_years: f64,
    market_price: f64,
    tolerance: f64,
    max_iterations: u32,
) -> IvResult {
    let (mut lo, mut hi) = (0.01_f64, 3.0_f64);
    if time_years <= 0.0 || market_price <= 0.0 {
        return IvResult { iv: lo, converged: false };
    }

    let price_at = |sigma: f64| BlackScholes::price(option_type, spot, strike, rate, sigma, time_years);

    let lo_price = price_at(lo);
    let hi_price = price_at(hi);
    // Price is monotonically increasing in sigma; if the market price is
    // outside [price(lo), price(hi)] no sigma in range reproduces it.
    if market_price < lo_price || market_price > hi_price {
        let edge = if market_price < lo_price { lo } else { hi };
        return IvResult { iv: edge, converged: false };
    }

    let mut mid = (lo + hi) / 2.0;
    for _ in 0..max_iterations {
        mid = (lo + hi) / 2.0;
        let mid_price = price_at(mid);
        if (mid_price - market_price).abs() <= tolerance {
            return IvResult { iv: mid, converged: true };
        }
        if mid_price < market_price {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    IvResult { iv: mid, converged: false }
}

/// A freshly observed broker-reported IV, if any, with its age.
#[derive(Debug, Clone, Copy)]
pub struct BrokerIv {
    pub iv: f64,
    pub age_secs: f64,
}

/// Chooses the first valid IV source per spec §4.1:
/// 1. broker IV if in range and fresh,
/// 2. bisection inversion from broker LTP,
/// 3. last good estimated IV,
/// 4. the configured default.
pub fn resolve_iv(
    cfg: &GreeksConfig,
    broker_iv: Option<BrokerIv>,
    option_type: OptionType,
    spot: f64,
    strike: f64,
    time_years: f64,
    market_price: Option<f64>,
    last_good_estimated_iv: Option<f64>,
) -> (f64, GreeksSource) {
    if let Some(b) = broker_iv {
        if b.iv >= cfg.broker_iv_min && b.iv <= cfg.broker_iv_max && b.age_secs <= cfg.broker_iv_max_age_secs {
            return (b.iv.clamp(cfg.iv_min, cfg.iv_max), GreeksSource::Broker);
        }
    }
    if let Some(price) = market_price {
        let result = invert_bisection(
            option_type,
            spot,
            strike,
            cfg.risk_free_rate,
            time_years,
            price,
            cfg.inversion_tolerance,
            cfg.inversion_max_iterations,
        );
        if result.converged {
            return (result.iv.clamp(cfg.iv_min, cfg.iv_max), GreeksSource::BsBrokerIv);
        }
    }
    if let Some(est) = last_good_estimated_iv {
        return (est.clamp(cfg.iv_min, cfg.iv_max), GreeksSource::BsEstimatedIv);
    }
    (cfg.default_iv.clamp(cfg.iv_min, cfg.iv_max), GreeksSource::DefaultIv)
}
