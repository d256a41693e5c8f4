//! End-to-end rate posterior pipeline: marginal likelihoods evaluated on
//! a rate grid, normalized, then interrogated for limits and intervals.

use siren_core::Experiment;
use siren_rate::{
    compute_lower_limit, compute_upper_limit, confidence_interval_min_width,
    hpd_credible_interval, integral_element, marg_likelihood, normalize_pdf,
};

fn rate_grid(mu_max: f64, points: usize) -> Vec<f64> {
    (0..points).map(|i| mu_max * i as f64 / (points - 1) as f64).collect()
}

fn posterior(experiments: &[Experiment], mu: &[f64], calerr: f64) -> Vec<f64> {
    mu.iter().map(|&m| marg_likelihood(experiments, m, calerr).unwrap()).collect()
}

#[test]
fn test_null_search_posterior_limits_are_consistent() {
    let experiments =
        [Experiment::new(1.0, 0.0), Experiment::new(0.5, 0.1).with_mc_error(0.05)];
    let mu = rate_grid(20.0, 401);
    let post = posterior(&experiments, &mu, 0.0);

    let norm = normalize_pdf(&mu, &post).unwrap();
    let total: f64 = integral_element(&mu, &norm).iter().sum();
    assert!((total - 1.0).abs() < 1e-9);

    let alpha = 0.9;
    let ul = compute_upper_limit(&mu, &post, alpha).unwrap();
    let ll = compute_lower_limit(&mu, &post, alpha).unwrap();
    assert!(ul >= ll);
    assert!(mu[0] <= ll && ul <= mu[mu.len() - 1]);

    // the normalized and raw posteriors agree up to cumulative rounding
    let ul_norm = compute_upper_limit(&mu, &norm, alpha).unwrap();
    assert!((ul - ul_norm).abs() <= 0.051, "{} vs {}", ul, ul_norm);

    let (lo, hi) = confidence_interval_min_width(&mu, &post, alpha).unwrap();
    assert!(hi - lo <= ul - ll + 1e-12);

    let (hlo, hhi) = hpd_credible_interval(&mu, &post, alpha, 1e-3).unwrap();
    assert!(mu[0] <= hlo && hhi <= mu[mu.len() - 1]);
    assert!(hlo <= hhi);
}

#[test]
fn test_more_sensitive_search_lowers_the_upper_limit() {
    let mu = rate_grid(50.0, 1001);
    let alpha = 0.9;

    let shallow = posterior(&[Experiment::new(0.5, 0.0)], &mu, 0.0);
    let deep = posterior(&[Experiment::new(2.0, 0.0)], &mu, 0.0);

    let ul_shallow = compute_upper_limit(&mu, &shallow, alpha).unwrap();
    let ul_deep = compute_upper_limit(&mu, &deep, alpha).unwrap();
    assert!(
        ul_deep < ul_shallow,
        "deep search limit {} should undercut shallow limit {}",
        ul_deep,
        ul_shallow
    );

    // the textbook null-result limit for VT = 1 is 2.303/VT
    let unit = posterior(&[Experiment::new(1.0, 0.0)], &mu, 0.0);
    let ul_unit = compute_upper_limit(&mu, &unit, alpha).unwrap();
    assert!((ul_unit - 2.303).abs() < 0.15, "unit-VT limit {} far from 2.303", ul_unit);
}

#[test]
fn test_calibration_error_weakens_the_limit() {
    let mu = rate_grid(30.0, 601);
    let alpha = 0.9;
    let experiments = [Experiment::new(1.0, 0.0)];

    let exact = posterior(&experiments, &mu, 0.0);
    let smeared = posterior(&experiments, &mu, 0.4);

    let ul_exact = compute_upper_limit(&mu, &exact, alpha).unwrap();
    let ul_smeared = compute_upper_limit(&mu, &smeared, alpha).unwrap();
    assert!(
        ul_smeared >= ul_exact,
        "calibration smearing should not tighten the limit: {} < {}",
        ul_smeared,
        ul_exact
    );
}
