//! Detection efficiency and sensitive-volume estimation from injection
//! campaigns.
//!
//! Injections are binned by physical distance. The per-bin efficiency is
//! the found fraction with its binomial standard error, and the sensitive
//! volume integrates the efficiency over spherical shells, either on
//! linear or logarithmic radial bins.

use siren_bins::BinEdges;
use siren_core::{Error, Injection, Result};
use std::f64::consts::PI;

/// Per-bin efficiency curve together with the integrated volume.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanEfficiency {
    /// Detection efficiency per distance bin.
    pub efficiency: Vec<f64>,
    /// Binomial standard error per distance bin.
    pub error: Vec<f64>,
    /// Sensitive volume integrated over the distance bins.
    pub volume: f64,
    /// Propagated one-sigma error on the volume.
    pub volume_error: f64,
}

/// Compute the detection efficiency as a function of distance for the
/// given sets of found and missed injection distances.
///
/// Each bin is the half-open interval `[lo, hi)`; injections outside
/// every bin are dropped. A bin containing no injections at all reports
/// efficiency zero with the missed count forced to one, so empty bins
/// never divide by zero.
pub fn compute_efficiency(
    found_dist: &[f64],
    missed_dist: &[f64],
    dbins: &BinEdges,
) -> (Vec<f64>, Vec<f64>) {
    let n = dbins.count();
    let mut efficiency = vec![0.0; n];
    let mut error = vec![0.0; n];

    for (j, (&dlow, &dhigh)) in dbins.lower().iter().zip(dbins.upper()).enumerate() {
        let found = found_dist.iter().filter(|&&d| dlow <= d && d < dhigh).count() as f64;
        let mut missed = missed_dist.iter().filter(|&&d| dlow <= d && d < dhigh).count() as f64;
        if found + missed == 0.0 {
            // avoid dividing by zero in empty bins
            missed = 1.0;
        }
        efficiency[j] = found / (found + missed);
        error[j] = (efficiency[j] * (1.0 - efficiency[j]) / (found + missed)).sqrt();
    }

    (efficiency, error)
}

/// Integrate an efficiency curve over spherical shells to obtain the
/// sensitive volume and its propagated error.
///
/// Linear bins integrate `4π r² ε(r) dr` with the bin midpoint as the
/// representative radius; logarithmic bins integrate the equivalent
/// `4π r³ ε(r) d(ln r)` with the log midpoint. Per-bin efficiency errors
/// are propagated as independent, summed in quadrature with the same
/// integration weights.
pub fn integrate_efficiency(
    dbins: &BinEdges,
    eff: &[f64],
    err: &[f64],
    log_bins: bool,
) -> Result<(f64, f64)> {
    let n = dbins.count();
    if eff.len() != n || err.len() != n {
        return Err(Error::Validation(format!(
            "efficiency length {} and error length {} must match the bin count {}",
            eff.len(),
            err.len(),
            n
        )));
    }

    let lower = dbins.lower();
    let upper = dbins.upper();
    let mut vol = 0.0;
    let mut var = 0.0;

    if log_bins {
        for j in 0..n {
            if lower[j] <= 0.0 {
                return Err(Error::Validation(format!(
                    "logarithmic distance bins require positive edges, got {}",
                    lower[j]
                )));
            }
            let dlogd = upper[j].ln() - lower[j].ln();
            let drep = (0.5 * (upper[j].ln() + lower[j].ln())).exp();
            let weight = 4.0 * PI * drep.powi(3) * dlogd;
            vol += weight * eff[j];
            var += (weight * err[j]).powi(2);
        }
    } else {
        for j in 0..n {
            let dd = upper[j] - lower[j];
            let drep = 0.5 * (upper[j] + lower[j]);
            let weight = 4.0 * PI * drep.powi(2) * dd;
            vol += weight * eff[j];
            var += (weight * err[j]).powi(2);
        }
    }

    Ok((vol, var.sqrt()))
}

/// Mean efficiency curve and sensitive volume for one injection set.
///
/// With no found injections there is no measured efficiency anywhere and
/// every output degenerates to zero.
pub fn mean_efficiency_volume(
    found: &[Injection],
    missed: &[Injection],
    dbins: &BinEdges,
) -> Result<MeanEfficiency> {
    if found.is_empty() {
        return Ok(MeanEfficiency {
            efficiency: vec![0.0; dbins.count()],
            error: vec![0.0; dbins.count()],
            volume: 0.0,
            volume_error: 0.0,
        });
    }

    let f_dist: Vec<f64> = found.iter().map(|l| l.distance).collect();
    let m_dist: Vec<f64> = missed.iter().map(|l| l.distance).collect();

    let (eff, err) = compute_efficiency(&f_dist, &m_dist, dbins);
    let (volume, volume_error) = integrate_efficiency(dbins, &eff, &err, false)?;

    Ok(MeanEfficiency { efficiency: eff, error: err, volume, volume_error })
}
