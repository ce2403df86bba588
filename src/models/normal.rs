const P: f64 = 0.2316419;
const INV_SQRT_2PI: f64 = 0.3989423;
const A: [f64; 5] = [0.3193815, -0.3565638, 1.781478, -1.821256, 1.330274];

/// Standard normal CDF, five-term rational approximation (Zelen & Severo).
///
/// Max absolute error is around 1e-7. The coefficients and the even/odd split
/// at x = 0 are kept exactly so valuations match reference output bit-for-bit.
/// Note N(0) evaluates to 0.49999985, not 0.5.
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    let t = 1.0 / (1.0 + P * x.abs());
    let d = INV_SQRT_2PI * (-x * x / 2.0).exp();
    let p = t * (A[0] + t * (A[1] + t * (A[2] + t * (A[3] + t * A[4]))));
    if x > 0.0 {
        1.0 - d * p
    } else {
        d * p
    }
}
