//! Highest-posterior-density credible intervals.
//!
//! The HPD region at coverage `alpha` collects the samples of highest
//! density whose enclosed probability reaches `alpha`. The density
//! threshold is found by bisection on the coverage of the super-level
//! region.

use crate::limits::{
    check_samples, compute_lower_limit, compute_upper_limit, integral_element,
    max_nonzero_sample, min_nonzero_sample, normalize_pdf,
};
use siren_core::{Error, Result};

/// Iteration cap for the threshold bisection.
const MAX_BISECTIONS: usize = 200;

/// Coverage of the HPD region at density threshold `thresh`: the pdf
/// integrated over the bins whose mean density exceeds the threshold.
pub fn hpd_coverage(mu: &[f64], pdf: &[f64], thresh: f64) -> f64 {
    integral_element(mu, pdf)
        .iter()
        .zip(pdf.windows(2))
        .filter(|&(_, p)| 0.5 * (p[0] + p[1]) > thresh)
        .map(|(&d, _)| d)
        .sum()
}

/// Density threshold whose super-level region covers at least `alpha`
/// and at most `alpha` plus the coverage spanned by `tol`.
///
/// The posterior is normalized internally, so the returned threshold is
/// on the normalized-density scale. The lower bracket never rises above
/// the exact threshold and the upper never falls below it; on exit the
/// lower bracket sits at or below the exact threshold with the coverage
/// gap between the brackets inside the tolerance.
pub fn hpd_threshold(mu: &[f64], post: &[f64], alpha: f64, tol: f64) -> Result<f64> {
    if !(0.0 < alpha && alpha < 1.0) {
        return Err(Error::Validation(format!("coverage must be in (0,1), got {}", alpha)));
    }
    if tol <= 0.0 {
        return Err(Error::Validation(format!("tolerance must be positive, got {}", tol)));
    }
    let norm = normalize_pdf(mu, post)?;
    let max_density = norm.iter().fold(0.0_f64, |a, &b| a.max(b));

    let mut p_minus = 0.0;
    let mut p_plus = max_density;
    let mut iterations = 0;
    while (hpd_coverage(mu, &norm, p_minus) - hpd_coverage(mu, &norm, p_plus)).abs() >= tol {
        let test = 0.5 * (p_minus + p_plus);
        if hpd_coverage(mu, &norm, test) >= alpha {
            // threshold too low or exactly right
            p_minus = test;
        } else {
            // threshold too high
            p_plus = test;
        }
        iterations += 1;
        if iterations >= MAX_BISECTIONS {
            log::warn!(
                "hpd_threshold: coverage gap still above {} after {} bisections",
                tol,
                MAX_BISECTIONS
            );
            break;
        }
    }

    Ok(p_minus)
}

/// HPD credible interval `[lo, hi]` of coverage `alpha` for a posterior
/// sampled at `mu`. Samples need not be evenly spaced and the posterior
/// need not be normalized.
///
/// A posterior whose true credible region is not contiguous is
/// over-covered: the returned interval spans from the lowest to the
/// highest sample above threshold. An exactly flat posterior has no
/// unique HPD region and degenerates to the central equal-tailed
/// interval.
pub fn hpd_credible_interval(
    mu: &[f64],
    post: &[f64],
    alpha: f64,
    tol: f64,
) -> Result<(f64, f64)> {
    check_samples(mu, post)?;
    if alpha == 1.0 {
        return Ok((min_nonzero_sample(mu, post)?, max_nonzero_sample(mu, post)?));
    }
    if !(0.0 < alpha && alpha < 1.0) {
        return Err(Error::Validation(format!("coverage must be in (0,1], got {}", alpha)));
    }

    let norm = normalize_pdf(mu, post)?;
    let p_max = norm.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let p_min = norm.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    if p_max - p_min <= p_max.abs() * 1e-12 {
        // flat posterior: every super-level set is all-or-nothing, so
        // take the central interval instead
        let half = 0.5 * (1.0 + alpha);
        return Ok((
            compute_lower_limit(mu, post, half)?,
            compute_upper_limit(mu, post, half)?,
        ));
    }

    let thresh = hpd_threshold(mu, post, alpha, tol)?;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (&m, &p) in mu.iter().zip(&norm) {
        if p > thresh {
            lo = lo.min(m);
            hi = hi.max(m);
        }
    }
    if !lo.is_finite() {
        return Err(Error::Computation("no samples above the HPD threshold".to_string()));
    }
    Ok((lo, hi))
}
