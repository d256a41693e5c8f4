//! Least-squares fit of the logarithmic volume derivative.

use nalgebra::{DMatrix, DVector};
use siren_core::{Error, Result};

/// Ordinary least squares of `ln(vols)` against `x`, returning
/// `(slope, intercept)`.
///
/// A zero or negative volume leaves the logarithm undefined; the fit is
/// abandoned with a warning and a zero slope and intercept. A fitted
/// negative slope arises from rounding error in the volumes and is
/// substituted with zero, again with a warning.
pub fn log_volume_derivative_fit(x: &[f64], vols: &[f64]) -> Result<(f64, f64)> {
    if x.len() != vols.len() {
        return Err(Error::Validation(format!(
            "control and volume lengths differ: {} vs {}",
            x.len(),
            vols.len()
        )));
    }
    if x.len() < 2 {
        return Err(Error::Validation(format!(
            "at least two samples required for a linear fit, got {}",
            x.len()
        )));
    }
    if vols.iter().any(|&v| v <= 0.0) {
        log::warn!(
            "cannot fit the log volume derivative, one or more volumes are not positive: {:?}",
            vols
        );
        return Ok((0.0, 0.0));
    }

    let n = x.len();
    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { x[i] } else { 1.0 });
    let rhs = DVector::from_iterator(n, vols.iter().map(|&v| v.ln()));
    let coeffs = design
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(|e| Error::Computation(format!("least-squares solve failed: {}", e)))?;

    let mut slope = coeffs[0];
    let intercept = coeffs[1];
    if slope < 0.0 {
        log::warn!("volume derivative fit gave slope {}; substituting 0", slope);
        slope = 0.0;
    }

    Ok((slope, intercept))
}
