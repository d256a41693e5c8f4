//! Mass-binned injection classification and volume-vs-mass tables.
//!
//! Injection sets are sliced per mass bin according to a closed set of
//! binning schemes, and each slice feeds the distance-binned efficiency
//! and volume estimators. Bin membership is half-open `[lo, hi)` in every
//! scheme; a record outside every bin is silently dropped.

use crate::efficiency::mean_efficiency_volume;
use serde::{Deserialize, Serialize};
use siren_bins::{BinEdges, BinnedArray, NdBins};
use siren_core::{Error, Injection, Result};

/// Mass binning schemes for injection classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinType {
    /// Two-dimensional component-mass bins, symmetric under exchange of
    /// the component labels.
    #[serde(rename = "Mass1_Mass2")]
    Mass1Mass2,
    /// Chirp-mass bins.
    #[serde(rename = "Chirp_Mass")]
    ChirpMass,
    /// Total-mass bins.
    #[serde(rename = "Total_Mass")]
    TotalMass,
    /// Bins on the first component mass; the second component is held
    /// fixed by the caller's injection set.
    #[serde(rename = "Component_Mass")]
    ComponentMass,
    /// Four-boundary binning into BNS, NSBH/BHNS and BBH classes.
    #[serde(rename = "BNS_BBH")]
    BnsBbh,
}

fn bin_range(edges: &BinEdges, bin: usize) -> Result<(f64, f64)> {
    // lower edges concatenated with the final upper edge give the full
    // boundary sequence, making the outermost edge explicit
    let boundaries = edges.edges();
    if bin + 1 >= boundaries.len() {
        return Err(Error::Validation(format!(
            "bin index {} out of range for {} bins",
            bin,
            edges.count()
        )));
    }
    Ok((boundaries[bin], boundaries[bin + 1]))
}

/// Select the injections that fall within the given mass bin.
///
/// `bin2` addresses the second grid dimension and is only meaningful for
/// [`BinType::Mass1Mass2`], where membership is symmetric under exchange
/// of the component masses.
pub fn filter_injections_by_mass(
    injs: &[Injection],
    mbins: &NdBins,
    bin: usize,
    bin_type: BinType,
    bin2: Option<usize>,
) -> Result<Vec<Injection>> {
    if bin_type == BinType::Mass1Mass2 {
        if mbins.ndim() != 2 {
            return Err(Error::Validation(format!(
                "Mass1_Mass2 binning needs two dimensions, got {}",
                mbins.ndim()
            )));
        }
        let bin2 = bin2.ok_or_else(|| {
            Error::Validation("Mass1_Mass2 binning needs a second bin index".to_string())
        })?;
        let (m1lo, m1hi) = bin_range(&mbins.dims()[0], bin)?;
        let (m2lo, m2hi) = bin_range(&mbins.dims()[1], bin2)?;
        let inside = |a: f64, b: f64| m1lo <= a && a < m1hi && m2lo <= b && b < m2hi;
        return Ok(injs
            .iter()
            .copied()
            .filter(|l| inside(l.mass1, l.mass2) || inside(l.mass2, l.mass1))
            .collect());
    }

    let edges = &mbins.dims()[0];
    let (mlow, mhigh) = bin_range(edges, bin)?;

    let selected = match bin_type {
        BinType::ChirpMass => injs
            .iter()
            .copied()
            .filter(|l| mlow <= l.mchirp && l.mchirp < mhigh)
            .collect(),
        BinType::TotalMass => injs
            .iter()
            .copied()
            .filter(|l| {
                let mtot = l.total_mass();
                mlow <= mtot && mtot < mhigh
            })
            .collect(),
        BinType::ComponentMass => injs
            .iter()
            .copied()
            .filter(|l| mlow <= l.mass1 && l.mass1 < mhigh)
            .collect(),
        BinType::BnsBbh => {
            let boundaries = edges.edges();
            if boundaries.len() < 4 {
                return Err(Error::Validation(format!(
                    "BNS_BBH binning needs four mass boundaries, got {}",
                    boundaries.len()
                )));
            }
            if bin == 0 || bin == 2 {
                // BNS/BBH: both components inside the same class range
                injs.iter()
                    .copied()
                    .filter(|l| {
                        mlow <= l.mass1
                            && l.mass1 < mhigh
                            && mlow <= l.mass2
                            && l.mass2 < mhigh
                    })
                    .collect()
            } else {
                // mixed class: neutron-star range crossed with the
                // black-hole range, in either component order
                let (ns_lo, ns_hi) = (boundaries[0], boundaries[1]);
                let (bh_lo, bh_hi) = (boundaries[2], boundaries[3]);
                injs.iter()
                    .copied()
                    .filter(|l| {
                        (ns_lo <= l.mass1
                            && l.mass1 < ns_hi
                            && bh_lo <= l.mass2
                            && l.mass2 < bh_hi)
                            || (ns_lo <= l.mass2
                                && l.mass2 < ns_hi
                                && bh_lo <= l.mass1
                                && l.mass1 < bh_hi)
                    })
                    .collect()
            }
        }
        BinType::Mass1Mass2 => unreachable!("handled above"),
    };

    Ok(selected)
}

/// Sensitive-volume tables over a mass-bin grid.
#[derive(Debug, Clone)]
pub struct VolumeVsMass {
    /// Mean sensitive volume per mass bin.
    pub volume: BinnedArray,
    /// One-sigma volume error per mass bin.
    pub volume_error: BinnedArray,
    /// Found-injection count per mass bin.
    pub found: BinnedArray,
    /// Missed-injection count per mass bin.
    pub missed: BinnedArray,
    /// Efficiency-vs-distance curve per mass bin, in grid iteration
    /// order, for diagnostic plots.
    pub eff_vs_mass: Vec<Vec<f64>>,
    /// Efficiency error curve per mass bin, in grid iteration order.
    pub err_vs_mass: Vec<Vec<f64>>,
}

/// Compute the average sensitive volume per mass bin from the sets of
/// found and missed injections, assuming sources uniform in volume.
///
/// The `Mass1_Mass2` scheme walks the full two-dimensional grid of
/// component-mass bin centres; every other scheme walks the single
/// dimension. Each mass cell records its found and missed counts, its
/// integrated volume with propagated error, and its efficiency curve.
pub fn compute_volume_vs_mass(
    found: &[Injection],
    missed: &[Injection],
    mass_bins: &NdBins,
    bin_type: BinType,
    dbins: &BinEdges,
) -> Result<VolumeVsMass> {
    let mut out = VolumeVsMass {
        volume: BinnedArray::new(mass_bins.clone()),
        volume_error: BinnedArray::new(mass_bins.clone()),
        found: BinnedArray::new(mass_bins.clone()),
        missed: BinnedArray::new(mass_bins.clone()),
        eff_vs_mass: Vec::new(),
        err_vs_mass: Vec::new(),
    };

    if bin_type == BinType::Mass1Mass2 {
        if mass_bins.ndim() != 2 {
            return Err(Error::Validation(format!(
                "Mass1_Mass2 binning needs two dimensions, got {}",
                mass_bins.ndim()
            )));
        }
        for j in 0..mass_bins.dims()[0].count() {
            for k in 0..mass_bins.dims()[1].count() {
                let newfound = filter_injections_by_mass(found, mass_bins, j, bin_type, Some(k))?;
                let newmissed =
                    filter_injections_by_mass(missed, mass_bins, j, bin_type, Some(k))?;

                out.found.set(&[j, k], newfound.len() as f64)?;
                out.missed.set(&[j, k], newmissed.len() as f64)?;

                let m = mean_efficiency_volume(&newfound, &newmissed, dbins)?;
                out.eff_vs_mass.push(m.efficiency);
                out.err_vs_mass.push(m.error);
                out.volume.set(&[j, k], m.volume)?;
                out.volume_error.set(&[j, k], m.volume_error)?;
            }
        }
        return Ok(out);
    }

    if mass_bins.ndim() != 1 {
        return Err(Error::Validation(format!(
            "one-dimensional mass bins required for this binning, got {} dimensions",
            mass_bins.ndim()
        )));
    }
    for j in 0..mass_bins.dims()[0].count() {
        let newfound = filter_injections_by_mass(found, mass_bins, j, bin_type, None)?;
        let newmissed = filter_injections_by_mass(missed, mass_bins, j, bin_type, None)?;

        out.found.set(&[j], newfound.len() as f64)?;
        out.missed.set(&[j], newmissed.len() as f64)?;

        let m = mean_efficiency_volume(&newfound, &newmissed, dbins)?;
        out.eff_vs_mass.push(m.efficiency);
        out.err_vs_mass.push(m.error);
        out.volume.set(&[j], m.volume)?;
        out.volume_error.set(&[j], m.volume_error)?;
    }

    Ok(out)
}
