//! Common data types for siren

use serde::{Deserialize, Serialize};

/// A found or missed software injection, reduced to the attributes the
/// efficiency and volume estimators consume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    /// First component mass (solar masses).
    pub mass1: f64,

    /// Second component mass (solar masses).
    pub mass2: f64,

    /// Chirp mass (solar masses). Derived from the component masses
    /// unless supplied externally; zero means "derive on construction".
    #[serde(default)]
    pub mchirp: f64,

    /// Physical distance to the source (Mpc).
    pub distance: f64,
}

impl Injection {
    /// Create an injection record, deriving the chirp mass
    /// `(m1 m2)^(3/5) / (m1 + m2)^(1/5)` from the component masses.
    pub fn new(mass1: f64, mass2: f64, distance: f64) -> Self {
        let mchirp = (mass1 * mass2).powf(0.6) / (mass1 + mass2).powf(0.2);
        Self { mass1, mass2, mchirp, distance }
    }

    /// Replace the derived chirp mass with an externally supplied value.
    pub fn with_mchirp(mut self, mchirp: f64) -> Self {
        self.mchirp = mchirp;
        self
    }

    /// Total mass `m1 + m2` (solar masses).
    pub fn total_mass(&self) -> f64 {
        self.mass1 + self.mass2
    }
}

/// Inputs from one independent search experiment entering the rate
/// posterior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Sensitive volume times observation time (VT).
    pub vt: f64,

    /// Loudest-event statistic Λ of the experiment.
    pub lambda_stat: f64,

    /// Monte Carlo error on the measured volume. Zero means the
    /// efficiency is taken as exactly measured.
    #[serde(default)]
    pub mc_error: f64,
}

impl Experiment {
    /// Create an experiment with an exactly measured volume.
    pub fn new(vt: f64, lambda_stat: f64) -> Self {
        Self { vt, lambda_stat, mc_error: 0.0 }
    }

    /// Attach a Monte Carlo volume error.
    pub fn with_mc_error(mut self, mc_error: f64) -> Self {
        self.mc_error = mc_error;
        self
    }
}
