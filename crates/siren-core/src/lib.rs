//! # siren-core
//!
//! Shared error and data types for the siren workspace: the error enum
//! used across all crates, the injection record consumed by the volume
//! estimators, and the per-experiment inputs to the rate posterior.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Experiment, Injection};

/// Workspace version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
