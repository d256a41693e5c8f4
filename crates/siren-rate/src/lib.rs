//! # siren-rate
//!
//! Statistical utilities for gravitational-wave search post-processing:
//! detection efficiency and sensitive-volume estimation from injection
//! campaigns, loudest-event marginal likelihoods for the astrophysical
//! rate, one-sided limits and credible intervals on sampled posteriors,
//! and the log-volume derivative fit.
//!
//! All routines are synchronous, single-threaded and pure given their
//! inputs; degenerate inputs take documented fallback values with a
//! `log` warning, while invalid inputs fail with a descriptive error.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Detection efficiency and sensitive-volume estimation.
pub mod efficiency;
/// Least-squares fit of the logarithmic volume derivative.
pub mod fit;
/// Highest-posterior-density credible intervals.
pub mod hpd;
/// Loudest-event marginal likelihoods for the astrophysical rate.
pub mod likelihood;
/// One-sided limits and minimum-width intervals on sampled posteriors.
pub mod limits;
/// Mass-binned injection classification and volume-vs-mass tables.
pub mod mass_bins;

pub use efficiency::{
    compute_efficiency, integrate_efficiency, mean_efficiency_volume, MeanEfficiency,
};
pub use fit::log_volume_derivative_fit;
pub use hpd::{hpd_coverage, hpd_credible_interval, hpd_threshold};
pub use likelihood::{marg_likelihood, marg_likelihood_monte_carlo};
pub use limits::{
    compute_lower_limit, compute_upper_limit, confidence_interval_min_width, integral_element,
    normalize_pdf,
};
pub use mass_bins::{compute_volume_vs_mass, filter_injections_by_mass, BinType, VolumeVsMass};
