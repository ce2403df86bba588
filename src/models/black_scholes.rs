use crate::models::normal::norm_cdf;
use crate::models::{OptionKind, PricingModel, PricingParams, Quote};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

/// European option pricing, Black-Scholes-Merton with no dividends.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
///
/// Call = S*N(d1) - K*e^(-rT)*N(d2)
/// Put  = K*e^(-rT)*N(-d2) - S*N(-d1)
///
/// Uses the rational-polynomial N(x) from `normal`, which is what the
/// reference test vectors were produced with.
pub struct BlackScholes;

impl BlackScholes {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingModel for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    #[inline]
    fn quote(&self, params: &PricingParams) -> Quote {
        quote_with(params, norm_cdf)
    }
}

/// Same formulas, exact normal CDF. Differs from `BlackScholes` by ~1e-7 in N(x).
pub struct ExactBlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl ExactBlackScholes {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }
}

impl Default for ExactBlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingModel for ExactBlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes (exact CDF)"
    }

    #[inline]
    fn quote(&self, params: &PricingParams) -> Quote {
        quote_with(params, |x| self.normal.cdf(x))
    }
}

/// Reference pricing entry point: polynomial CDF, plain arguments.
///
/// Preconditions: spot > 0, strike > 0, volatility > 0. Callers guard these.
#[inline]
pub fn price(
    spot: f64,
    strike: f64,
    ttl_years: f64,
    rate: f64,
    volatility: f64,
    kind: OptionKind,
) -> Quote {
    let params = PricingParams::new(spot, strike, ttl_years, rate, volatility, kind);
    quote_with(&params, norm_cdf)
}

fn quote_with(params: &PricingParams, cdf: impl Fn(f64) -> f64) -> Quote {
    let PricingParams {
        spot: s,
        strike: k,
        ttl_years: t,
        rate: r,
        sigma,
        kind,
        ..
    } = *params;

    // Terminal branch: at or past expiry the formula would divide by zero
    if t <= 0.0 {
        return Quote::at_expiry(kind, s, k);
    }

    let sqrt_t = params.sqrt_t;
    let d1 = (params.ln_s_k + (r + (sigma * sigma) / 2.0) * t) / params.sigma_sqrt_t;
    let d2 = d1 - params.sigma_sqrt_t;
    let discounted_strike = k * params.discount;

    let (raw_price, delta) = match kind {
        OptionKind::Call => (s * cdf(d1) - discounted_strike * cdf(d2), cdf(d1)),
        OptionKind::Put => (discounted_strike * cdf(-d2) - s * cdf(-d1), cdf(d1) - 1.0),
    };

    // Time decay shared by both sides, then the carry on the discounted strike
    let decay = -(s * sigma * (-(d1 * d1) / 2.0).exp()) / (2.0 * (2.0 * PI).sqrt() * sqrt_t);
    let theta = match kind {
        OptionKind::Call => (decay - r * k * params.discount * cdf(d2)) / 365.0,
        OptionKind::Put => (decay + r * k * params.discount * cdf(-d2)) / 365.0,
    };

    let intrinsic = kind.intrinsic(s, k);

    Quote {
        price: raw_price.max(0.0),
        delta,
        theta,
        intrinsic_value: intrinsic,
        extrinsic_value: (raw_price - intrinsic).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: f64 = 0.045;

    #[test]
    fn test_atm_weekly_call_reference() {
        let q = price(130.0, 130.0, 7.0 / 365.0, R, 0.50, OptionKind::Call);
        assert!((q.price - 3.6452).abs() < 1e-2, "price={}", q.price);
        assert!((q.delta - 0.5188).abs() < 1e-2, "delta={}", q.delta);
        assert!(q.theta < 0.0);
        assert_eq!(q.intrinsic_value, 0.0);
        assert!((q.extrinsic_value - q.price).abs() < 1e-12);
    }

    #[test]
    fn test_expiry_branch() {
        for kind in [OptionKind::Call, OptionKind::Put] {
            for t in [0.0, -0.5] {
                let q = price(140.0, 130.0, t, R, 0.4, kind);
                assert_eq!(q.price, q.intrinsic_value);
                assert_eq!(q.delta, 0.0);
                assert_eq!(q.theta, 0.0);
                assert_eq!(q.extrinsic_value, 0.0);
            }
        }
        assert_eq!(price(140.0, 130.0, 0.0, R, 0.4, OptionKind::Call).price, 10.0);
        assert_eq!(price(140.0, 130.0, 0.0, R, 0.4, OptionKind::Put).price, 0.0);
        assert_eq!(price(120.0, 130.0, 0.0, R, 0.4, OptionKind::Put).price, 10.0);
    }

    #[test]
    fn test_put_call_parity() {
        for &(s, k, days, sigma) in &[
            (130.0, 130.0, 30.0, 0.45),
            (120.0, 130.0, 90.0, 0.30),
            (150.0, 110.0, 180.0, 0.38),
            (100.0, 160.0, 7.0, 0.80),
        ] {
            let t = days / 365.0;
            let c = price(s, k, t, R, sigma, OptionKind::Call).price;
            let p = price(s, k, t, R, sigma, OptionKind::Put).price;
            let forward = s - k * (-R * t).exp();
            assert!((c - p - forward).abs() < 1e-6, "parity gap at S={s} K={k}: {}", c - p - forward);
        }
    }

    #[test]
    fn test_delta_bounds() {
        for &s in &[60.0, 100.0, 130.0, 160.0, 300.0] {
            for &days in &[1.0, 7.0, 30.0, 365.0] {
                let t = days / 365.0;
                let c = price(s, 130.0, t, R, 0.5, OptionKind::Call);
                let p = price(s, 130.0, t, R, 0.5, OptionKind::Put);
                assert!((0.0..=1.0).contains(&c.delta), "call delta {}", c.delta);
                assert!((-1.0..=0.0).contains(&p.delta), "put delta {}", p.delta);
            }
        }
    }

    #[test]
    fn test_non_negative_outputs() {
        for &s in &[1.0, 50.0, 130.0, 500.0, 10_000.0] {
            for &k in &[1.0, 130.0, 5_000.0] {
                for &sigma in &[1e-4, 0.2, 3.0] {
                    for kind in [OptionKind::Call, OptionKind::Put] {
                        let q = price(s, k, 30.0 / 365.0, R, sigma, kind);
                        assert!(q.price >= 0.0);
                        assert!(q.extrinsic_value >= 0.0);
                        assert!(q.intrinsic_value >= 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_price_splits_into_intrinsic_and_extrinsic() {
        let q = price(150.0, 130.0, 30.0 / 365.0, R, 0.45, OptionKind::Call);
        assert_eq!(q.intrinsic_value, 20.0);
        assert!((q.intrinsic_value + q.extrinsic_value - q.price).abs() < 1e-12);

        let q = price(125.0, 150.0, 30.0 / 365.0, R, 0.45, OptionKind::Put);
        assert_eq!(q.intrinsic_value, 25.0);
        assert!((q.price - 25.1141).abs() < 1e-3, "put price={}", q.price);
        assert!((q.intrinsic_value + q.extrinsic_value - q.price).abs() < 1e-12);
    }

    #[test]
    fn test_exact_model_close_to_polynomial() {
        let poly = BlackScholes::new();
        let exact = ExactBlackScholes::new();
        let params = PricingParams::from_days(130.0, 130.0, 30, R, 0.45, OptionKind::Call);
        let a = poly.quote(&params);
        let b = exact.quote(&params);
        assert!((a.price - b.price).abs() < 1e-4);
        assert!((a.delta - b.delta).abs() < 1e-6);
        assert!((a.theta - b.theta).abs() < 1e-6);
    }

    #[test]
    fn test_longer_dated_worth_more() {
        let short = price(130.0, 130.0, 7.0 / 365.0, R, 0.45, OptionKind::Call);
        let long = price(130.0, 130.0, 180.0 / 365.0, R, 0.45, OptionKind::Call);
        assert!(long.price > short.price);
        // Short-dated ATM options decay faster per day
        assert!(short.theta < long.theta);
    }
}
