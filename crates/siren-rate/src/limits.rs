//! One-sided limits and minimum-width intervals on sampled posteriors.
//!
//! A posterior is a pair of matched-length slices: sample values and the
//! density at each sample. Samples must be monotonically increasing but
//! need not be evenly spaced, and the density need not be normalized;
//! the cumulative used by the limit searches always starts near zero and
//! ends at one after normalization, so the bisections stay in range.

use siren_core::{Error, Result};

/// Trapezium-rule integrand elements `dmu * mean(pdf)` over adjacent
/// samples. Output length is one less than the input length.
pub fn integral_element(mu: &[f64], pdf: &[f64]) -> Vec<f64> {
    mu.windows(2)
        .zip(pdf.windows(2))
        .map(|(m, p)| (m[1] - m[0]) * 0.5 * (p[0] + p[1]))
        .collect()
}

/// Normalize a density sampled at `mu` into a suitable pdf.
///
/// Fails on any negative probability or any negative sample value;
/// otherwise rescales so the integral elements sum to one.
pub fn normalize_pdf(mu: &[f64], pofmu: &[f64]) -> Result<Vec<f64>> {
    check_samples(mu, pofmu)?;
    if pofmu.iter().any(|&p| p < 0.0) {
        return Err(Error::Validation(
            "probabilities cannot be negative, refusing to normalize".to_string(),
        ));
    }
    if mu.iter().any(|&m| m < 0.0) {
        return Err(Error::Validation(
            "rates cannot be negative, refusing to normalize over a negative domain".to_string(),
        ));
    }

    let total: f64 = integral_element(mu, pofmu).iter().sum();
    if total <= 0.0 {
        return Err(Error::Computation("posterior integrates to zero".to_string()));
    }
    Ok(pofmu.iter().map(|&p| p / total).collect())
}

/// Upper limit of confidence level `alpha` for a posterior `post`
/// sampled at `mu`. The posterior need not be normalized.
///
/// `alpha == 1` returns the largest sample with nonzero posterior;
/// any `alpha` outside `(0, 1]` is invalid.
pub fn compute_upper_limit(mu: &[f64], post: &[f64], alpha: f64) -> Result<f64> {
    check_samples(mu, post)?;
    if alpha == 1.0 {
        return max_nonzero_sample(mu, post);
    }
    if !(0.0 < alpha && alpha < 1.0) {
        return Err(Error::Validation(format!(
            "confidence level must be in (0,1], got {}",
            alpha
        )));
    }

    let cum = cumulative(mu, post)?;
    // the cumulative begins near 0 and ends at 1, so the insertion point
    // is always a valid sample index
    let idx = cum.partition_point(|&c| c < alpha);
    Ok(mu[idx])
}

/// Lower limit of confidence level `alpha` for a posterior `post`
/// sampled at `mu`. The posterior need not be normalized.
///
/// `alpha == 1` returns the smallest sample with nonzero posterior;
/// any `alpha` outside `(0, 1]` is invalid.
pub fn compute_lower_limit(mu: &[f64], post: &[f64], alpha: f64) -> Result<f64> {
    check_samples(mu, post)?;
    if alpha == 1.0 {
        return min_nonzero_sample(mu, post);
    }
    if !(0.0 < alpha && alpha < 1.0) {
        return Err(Error::Validation(format!(
            "confidence level must be in (0,1], got {}",
            alpha
        )));
    }

    let cum = cumulative(mu, post)?;
    let idx = cum.partition_point(|&c| c <= 1.0 - alpha);
    Ok(mu[idx])
}

/// Minimal-width confidence interval `[lo, hi]` of level `alpha`, found
/// by sliding the tail allocation from 0 to `1 - alpha` in steps of
/// 0.01 and keeping the narrowest window.
pub fn confidence_interval_min_width(
    mu: &[f64],
    post: &[f64],
    alpha: f64,
) -> Result<(f64, f64)> {
    check_samples(mu, post)?;
    if !(0.0 < alpha && alpha < 1.0) {
        return Err(Error::Validation(format!(
            "confidence level must be in (0,1), got {}",
            alpha
        )));
    }

    const ALPHA_STEP: f64 = 0.01;

    let mut mu_low = mu[0];
    let mut mu_high = mu[mu.len() - 1];

    let mut step = 0usize;
    loop {
        let ai = step as f64 * ALPHA_STEP;
        if ai >= 1.0 - alpha {
            break;
        }
        let ml = compute_lower_limit(mu, post, 1.0 - ai)?;
        let mh = compute_upper_limit(mu, post, alpha + ai)?;
        if mh - ml < mu_high - mu_low {
            mu_low = ml;
            mu_high = mh;
        }
        step += 1;
    }

    Ok((mu_low, mu_high))
}

pub(crate) fn check_samples(mu: &[f64], post: &[f64]) -> Result<()> {
    if mu.len() != post.len() {
        return Err(Error::Validation(format!(
            "sample and density lengths differ: {} vs {}",
            mu.len(),
            post.len()
        )));
    }
    if mu.len() < 2 {
        return Err(Error::Validation(format!(
            "at least two posterior samples required, got {}",
            mu.len()
        )));
    }
    Ok(())
}

pub(crate) fn cumulative(mu: &[f64], post: &[f64]) -> Result<Vec<f64>> {
    let dp = integral_element(mu, post);
    let total: f64 = dp.iter().sum();
    if total <= 0.0 {
        return Err(Error::Computation("posterior integrates to zero".to_string()));
    }
    let mut acc = 0.0;
    Ok(dp
        .iter()
        .map(|&d| {
            acc += d;
            acc / total
        })
        .collect())
}

pub(crate) fn min_nonzero_sample(mu: &[f64], post: &[f64]) -> Result<f64> {
    mu.iter()
        .zip(post)
        .filter(|&(_, &p)| p > 0.0)
        .map(|(&m, _)| m)
        .fold(None, |acc: Option<f64>, m| Some(acc.map_or(m, |a| a.min(m))))
        .ok_or_else(|| Error::Computation("posterior is identically zero".to_string()))
}

pub(crate) fn max_nonzero_sample(mu: &[f64], post: &[f64]) -> Result<f64> {
    mu.iter()
        .zip(post)
        .filter(|&(_, &p)| p > 0.0)
        .map(|(&m, _)| m)
        .fold(None, |acc: Option<f64>, m| Some(acc.map_or(m, |a| a.max(m))))
        .ok_or_else(|| Error::Computation("posterior is identically zero".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform_grid(n: usize) -> (Vec<f64>, Vec<f64>) {
        let mu: Vec<f64> = (0..n).map(|i| i as f64 / (n - 1) as f64).collect();
        let post = vec![1.0; n];
        (mu, post)
    }

    #[test]
    fn test_integral_element_trapezium() {
        let dp = integral_element(&[0.0, 1.0, 3.0], &[0.0, 2.0, 2.0]);
        assert_eq!(dp.len(), 2);
        assert_relative_eq!(dp[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(dp[1], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_pdf_unit_integral() {
        let mu = [0.0, 1.0, 2.0, 4.0];
        let post = [1.0, 3.0, 2.0, 0.5];
        let norm = normalize_pdf(&mu, &post).unwrap();
        let total: f64 = integral_element(&mu, &norm).iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_pdf_rejects_negatives() {
        assert!(normalize_pdf(&[0.0, 1.0], &[1.0, -0.5]).is_err());
        assert!(normalize_pdf(&[-1.0, 1.0], &[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_upper_limit_uniform() {
        let (mu, post) = uniform_grid(101);
        let ul = compute_upper_limit(&mu, &post, 0.9).unwrap();
        assert_relative_eq!(ul, 0.9, epsilon = 0.011);
    }

    #[test]
    fn test_lower_limit_uniform() {
        let (mu, post) = uniform_grid(101);
        let ll = compute_lower_limit(&mu, &post, 0.9).unwrap();
        assert_relative_eq!(ll, 0.1, epsilon = 0.011);
    }

    #[test]
    fn test_limits_ordering_and_range() {
        let mu: Vec<f64> = (0..200).map(|i| i as f64 * 0.05).collect();
        // asymmetric hump
        let post: Vec<f64> = mu.iter().map(|&m| m * (-m / 1.5).exp()).collect();
        for alpha in [0.5, 0.68, 0.9, 0.99] {
            let ul = compute_upper_limit(&mu, &post, alpha).unwrap();
            let ll = compute_lower_limit(&mu, &post, alpha).unwrap();
            assert!(ul >= ll, "alpha={}: ul={} < ll={}", alpha, ul, ll);
            assert!(mu[0] <= ll && ul <= mu[mu.len() - 1]);
        }
    }

    #[test]
    fn test_alpha_one_returns_nonzero_support() {
        let mu = [0.0, 1.0, 2.0, 3.0, 4.0];
        let post = [0.0, 1.0, 2.0, 1.0, 0.0];
        assert_eq!(compute_upper_limit(&mu, &post, 1.0).unwrap(), 3.0);
        assert_eq!(compute_lower_limit(&mu, &post, 1.0).unwrap(), 1.0);
    }

    #[test]
    fn test_alpha_validation() {
        let (mu, post) = uniform_grid(11);
        assert!(compute_upper_limit(&mu, &post, 0.0).is_err());
        assert!(compute_upper_limit(&mu, &post, 1.5).is_err());
        assert!(compute_lower_limit(&mu, &post, -0.1).is_err());
    }

    #[test]
    fn test_unnormalized_posterior_gives_same_limits() {
        let mu: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
        let post: Vec<f64> = mu.iter().map(|&m| (-m).exp()).collect();
        let scaled: Vec<f64> = post.iter().map(|&p| 37.5 * p).collect();
        let a = compute_upper_limit(&mu, &post, 0.9).unwrap();
        let b = compute_upper_limit(&mu, &scaled, 0.9).unwrap();
        // identical up to one grid step of cumulative rounding
        assert!((a - b).abs() <= 0.1 + 1e-12, "{} vs {}", a, b);
    }

    #[test]
    fn test_min_width_no_wider_than_naive() {
        let mu: Vec<f64> = (0..200).map(|i| i as f64 * 0.05).collect();
        let post: Vec<f64> = mu.iter().map(|&m| m * (-m / 1.5).exp()).collect();
        let alpha = 0.9;
        let (lo, hi) = confidence_interval_min_width(&mu, &post, alpha).unwrap();
        let naive_lo = compute_lower_limit(&mu, &post, alpha).unwrap();
        let naive_hi = compute_upper_limit(&mu, &post, alpha).unwrap();
        assert!(hi - lo <= naive_hi - naive_lo + 1e-12);
        assert!(lo >= mu[0] && hi <= mu[mu.len() - 1]);
    }

    #[test]
    fn test_min_width_alpha_validation() {
        let (mu, post) = uniform_grid(11);
        assert!(confidence_interval_min_width(&mu, &post, 1.0).is_err());
        assert!(confidence_interval_min_width(&mu, &post, 0.0).is_err());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(compute_upper_limit(&[0.0, 1.0], &[1.0], 0.9).is_err());
        assert!(normalize_pdf(&[0.0], &[1.0]).is_err());
    }
}
