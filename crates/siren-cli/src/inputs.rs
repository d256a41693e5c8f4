//! Input documents accepted by the CLI subcommands.

use serde::Deserialize;
use siren_core::{Experiment, Injection};
use std::path::Path;

/// Experiment list for the `posterior` subcommand.
#[derive(Debug, Clone, Deserialize)]
pub struct PosteriorInput {
    /// Independent search experiments entering the rate posterior.
    pub experiments: Vec<Experiment>,

    /// Shared log-normal calibration error; zero disables the
    /// calibration marginalization.
    #[serde(default)]
    pub calibration_error: f64,
}

/// Sampled posterior for the `limits` subcommand.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsInput {
    /// Rate sample values, monotonically increasing.
    pub mu: Vec<f64>,
    /// Posterior density at each sample; need not be normalized.
    pub posterior: Vec<f64>,
}

/// Injection lists and binning for the `volume` subcommand.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeInput {
    /// Found injections.
    pub found: Vec<Injection>,
    /// Missed injections.
    pub missed: Vec<Injection>,
    /// Mass binning scheme.
    pub bin_type: siren_rate::BinType,
    /// One or two mass-bin edge sequences.
    pub mass_bins: Vec<Vec<f64>>,
    /// Distance-bin edge sequence.
    pub distance_bins: Vec<f64>,
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Derive missing chirp masses from the component masses.
pub fn with_derived_mchirp(injections: &[Injection]) -> Vec<Injection> {
    injections
        .iter()
        .map(|l| {
            if l.mchirp == 0.0 {
                Injection::new(l.mass1, l.mass2, l.distance)
            } else {
                *l
            }
        })
        .collect()
}
