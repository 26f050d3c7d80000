//! Black-Scholes pricing and Greeks (spec §4.1). Grounded on
//! `options-engine`'s `BlackScholes` struct (`norm_cdf`/`norm_pdf`/`d1`/`d2`/
//! `price`/`calculate_greeks`), trimmed to the first-order Greeks the spec
//! names (Delta, Gamma, Theta, Vega) and reworked for the spec's edge-case
//! contract: `sigma <= 0` clamps to `1e-4`, `time <= 0` returns intrinsic
//! value with zero sensitivities rather than a panic or `NaN`.

use crate::model::OptionType;

const SQRT_2PI: f64 = 2.5066282746310007;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PricedGreeks {
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
    /// Per trading day.
    pub theta: f64,
    /// Per 1% change in IV.
    pub vega: f64,
}

#[derive(Debug)]
pub struct BlackScholes;

impl BlackScholes {
    pub fn norm_cdf(x: f64) -> f64 {
        0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
    }

    pub fn norm_pdf(x: f64) -> f64 {
        (-0.5 * x * x).exp() / SQRT_2PI
    }

    fn d1(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
        ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt())
    }

    fn d2(d1: f64, sigma: f64, t: f64) -> f64 {
        d1 - sigma * t.sqrt()
    }

    /// Clamp volatility to a safe positive floor; a non-positive IV would
    /// make `d1`/`d2` undefined (spec §4.1 edge case).
    fn safe_sigma(sigma: f64) -> f64 {
        if sigma <= 0.0 { 1e-4 } else { sigma }
    }

    fn intrinsic(option_type: OptionType, spot: f64, strike: f64) -> f64 {
        match option_type {
            OptionType::Ce => (spot - strike).max(0.0),
            OptionType::Pe => (strike - spot).max(0.0),
        }
    }

    pub fn price(option_type: OptionType, spot: f64, strike: f64, rate: f64, sigma: f64, time_years: f64) -> f64 {
        if time_years <= 0.0 {
            return Self::intrinsic(option_type, spot, strike);
        }
        let sigma = Self::safe_sigma(sigma);
        let d1 = Self::d1(spot, strike, rate, sigma, time_years);
        let d2 = Self::d2(d1, sigma, time_years);
        let discount = (-rate * time_years).exp();
        match option_type {
            OptionType::Ce => spot * Self::norm_cdf(d1) - strike * discount * Self::norm_cdf(d2),
            OptionType::Pe => strike * discount * Self::norm_cdf(-d2) - spot * Self::norm_cdf(-d1),
        }
    }

    /// Price plus Delta/Gamma/Theta/Vega. `time_years <= 0` returns intrinsic
    /// value with all sensitivities zero, per spec §4.1.
    pub fn price_and_greeks(
        option_type: OptionType,
        spot: f64,
        strike: f64,
        rate: f64,
        sigma: f64,
        time_years: f64,
    ) -> PricedGreeks {
        if time_years <= 0.0 {
            return PricedGreeks { price: Self::intrinsic(option_type, spot, strike), ..Default::default() };
        }
        let sigma = Self::safe_sigma(sigma);
        let sqrt_t = time_years.sqrt();
        let d1 = Self::d1(spot, strike, rate, sigma, time_years);
        let d2 = Self::d2(d1, sigma, time_years);
        let nd1 = Self::norm_cdf(d1);
        let nd2 = Self::norm_cdf(d2);
        let npd1 = Self::norm_pdf(d1);
        let discount = (-rate * time_years).exp();

        let (price, delta) = match option_type {
            OptionType::Ce => (spot * nd1 - strike * discount * nd2, nd1),
            OptionType::Pe => (strike * discount * Self::norm_cdf(-d2) - spot * Self::norm_cdf(-d1), nd1 - 1.0),
        };

        let gamma = npd1 / (spot * sigma * sqrt_t);

        let theta_annual = match option_type {
            OptionType::Ce => -(spot * npd1 * sigma) / (2.0 * sqrt_t) - rate * strike * discount * nd2,
            OptionType::Pe => -(spot * npd1 * sigma) / (2.0 * sqrt_t) + rate * strike * discount * Self::norm_cdf(-d2),
        };
        let theta = theta_annual / 365.0;

        let vega = spot * npd1 * sqrt_t / 100.0;

        PricedGreeks { price, delta, gamma, theta, vega }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::*;

    #[fixture]
    fn nifty_params() -> (f64, f64, f64, f64, f64) {
        // spot, strike, rate, iv, time (30 days)
        (21500.0, 21500.0, 0.065, 0.15, 30.0 / 365.0)
    }

    #[rstest]
    fn norm_cdf_standard_values() {
        assert_abs_diff_eq!(BlackScholes::norm_cdf(0.0), 0.5, epsilon = 1e-10);
        assert_abs_diff_eq!(BlackScholes::norm_cdf(1.96), 0.975, epsilon = 1e-3);
    }

    #[rstest]
    fn call_delta_is_between_zero_and_one(nifty_params: (f64, f64, f64, f64, f64)) {
        let (s, k, r, sigma, t) = nifty_params;
        let g = BlackScholes::price_and_greeks(OptionType::Ce, s, k, r, sigma, t);
        assert!(g.delta > 0.0 && g.delta < 1.0);
        assert!(g.gamma >= 0.0);
        assert!(g.theta <= 0.0);
        assert!(g.vega >= 0.0);
    }

    #[rstest]
    fn put_delta_is_between_minus_one_and_zero(nifty_params: (f64, f64, f64, f64, f64)) {
        let (s, k, r, sigma, t) = nifty_params;
        let g = BlackScholes::price_and_greeks(OptionType::Pe, s, k, r, sigma, t);
        assert!(g.delta > -1.0 && g.delta < 0.0);
    }

    #[rstest]
    fn zero_time_collapses_to_intrinsic_with_zero_sensitivities() {
        let g = BlackScholes::price_and_greeks(OptionType::Ce, 21500.0, 21000.0, 0.065, 0.15, 0.0);
        assert_abs_diff_eq!(g.price, 500.0, epsilon = 1e-9);
        assert_eq!(g.delta, 0.0);
        assert_eq!(g.gamma, 0.0);
        assert_eq!(g.theta, 0.0);
        assert_eq!(g.vega, 0.0);
    }

    #[rstest]
    fn non_positive_sigma_is_clamped_not_panicking() {
        let g = BlackScholes::price_and_greeks(OptionType::Ce, 21500.0, 21500.0, 0.065, 0.0, 0.05);
        assert!(g.price.is_finite());
        assert!(g.delta.is_finite());
    }

    #[rstest]
    fn atm_call_delta_is_near_half(nifty_params: (f64, f64, f64, f64, f64)) {
        let (s, k, r, sigma, t) = nifty_params;
        let g = BlackScholes::price_and_greeks(OptionType::Ce, s, k, r, sigma, t);
        assert_abs_diff_eq!(g.delta, 0.5, epsilon = 0.1);
    }
}
