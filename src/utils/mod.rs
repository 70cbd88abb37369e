//! Helpful utilities

mod mean_and_variance;
pub use self::mean_and_variance::MeanAndVariance;

/// Numerically stable `ln(sum(exp(xs)))`.
///
/// Non-finite `-inf` entries contribute nothing; an empty slice or one holding
/// only `-inf` gives `-inf`.
///
/// # Example
/// ```rust
/// use compound_mcmc::utils::log_sum_exp;
///
/// let lse = log_sum_exp(&[0.0_f64.ln(), 1.0_f64.ln(), 3.0_f64.ln()]);
/// assert!((lse - 4.0_f64.ln()).abs() < 1E-12);
/// ```
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

/// Index drawn with probability proportional to `exp(ln_weights[i])`.
///
/// `u` is a uniform draw in `[0, 1)`. Returns `None` when no weight is finite.
pub(crate) fn sample_ln_weights(ln_weights: &[f64], u: f64) -> Option<usize> {
    let lse = log_sum_exp(ln_weights);
    if !lse.is_finite() {
        return None;
    }
    let mut cdf = 0.0;
    let mut last = None;
    for (i, w) in ln_weights.iter().enumerate() {
        if !w.is_finite() {
            continue;
        }
        cdf += (w - lse).exp();
        last = Some(i);
        if u < cdf {
            return last;
        }
    }
    // Rounding can leave the total just under 1.
    last
}
