//! # siren-bins
//!
//! Bin-edge definitions and binned accumulators for mass and distance
//! grids.
//!
//! A [`BinEdges`] partitions a continuous parameter range into half-open
//! intervals `[lo, hi)`; a value equal to the final upper edge lies
//! outside every bin. [`NdBins`] stacks one or two edge definitions into
//! a rectangular grid and [`BinnedArray`] accumulates one scalar per grid
//! cell, addressable either by bin index or by any coordinate tuple
//! falling inside a cell. Edge lookup is a binary search performed at the
//! call site, never per stored record.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use siren_core::{Error, Result};

/// An increasing sequence of bin edges partitioning a parameter range
/// into half-open `[lo, hi)` intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    /// Build from an explicit edge sequence. At least two strictly
    /// increasing edges are required.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::Validation(format!(
                "at least two bin edges required, got {}",
                edges.len()
            )));
        }
        if edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::Validation("bin edges must be strictly increasing".to_string()));
        }
        Ok(Self { edges })
    }

    /// Evenly spaced edges over `[lo, hi]` defining `count` bins.
    pub fn linear(lo: f64, hi: f64, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::Validation("at least one bin required".to_string()));
        }
        let step = (hi - lo) / count as f64;
        let edges = (0..=count).map(|i| lo + step * i as f64).collect();
        Self::new(edges)
    }

    /// Number of bins, one less than the number of edges.
    pub fn count(&self) -> usize {
        self.edges.len() - 1
    }

    /// The full edge sequence, `count() + 1` values.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower edge of each bin.
    pub fn lower(&self) -> &[f64] {
        &self.edges[..self.edges.len() - 1]
    }

    /// Upper edge of each bin.
    pub fn upper(&self) -> &[f64] {
        &self.edges[1..]
    }

    /// Midpoint of each bin.
    pub fn centres(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Index of the bin containing `value`, or `None` if the value lies
    /// outside every bin. The final upper edge is excluded.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        if value < self.edges[0] || value >= self.edges[self.edges.len() - 1] {
            return None;
        }
        let idx = self.edges.partition_point(|&e| e <= value);
        Some(idx - 1)
    }
}

/// A one- or two-dimensional rectangular binning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdBins {
    dims: Vec<BinEdges>,
}

impl NdBins {
    /// One-dimensional binning.
    pub fn one(edges: BinEdges) -> Self {
        Self { dims: vec![edges] }
    }

    /// Two-dimensional binning.
    pub fn two(first: BinEdges, second: BinEdges) -> Self {
        Self { dims: vec![first, second] }
    }

    /// Build from an explicit dimension list (one or two dimensions).
    pub fn from_dims(dims: Vec<BinEdges>) -> Result<Self> {
        if dims.is_empty() || dims.len() > 2 {
            return Err(Error::Validation(format!(
                "one or two bin dimensions supported, got {}",
                dims.len()
            )));
        }
        Ok(Self { dims })
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// The per-dimension edge definitions.
    pub fn dims(&self) -> &[BinEdges] {
        &self.dims
    }

    /// Bin count per dimension.
    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(BinEdges::count).collect()
    }

    /// Total number of grid cells.
    pub fn cells(&self) -> usize {
        self.dims.iter().map(BinEdges::count).product()
    }
}

/// Dense scalar accumulator over an [`NdBins`] grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedArray {
    bins: NdBins,
    data: Vec<f64>,
}

impl BinnedArray {
    /// Zero-filled accumulator over the given grid.
    pub fn new(bins: NdBins) -> Self {
        let data = vec![0.0; bins.cells()];
        Self { bins, data }
    }

    /// The grid this accumulator is defined over.
    pub fn bins(&self) -> &NdBins {
        &self.bins
    }

    /// The stored values in row-major grid order.
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Value at a bin index tuple.
    pub fn get(&self, idx: &[usize]) -> Result<f64> {
        Ok(self.data[self.flat_index(idx)?])
    }

    /// Store a value at a bin index tuple.
    pub fn set(&mut self, idx: &[usize], value: f64) -> Result<()> {
        let flat = self.flat_index(idx)?;
        self.data[flat] = value;
        Ok(())
    }

    /// Value at the cell containing the coordinate tuple (for example a
    /// bin-centre tuple).
    pub fn at(&self, coords: &[f64]) -> Result<f64> {
        if coords.len() != self.bins.ndim() {
            return Err(Error::Validation(format!(
                "coordinate tuple has {} entries for a {}-dimensional grid",
                coords.len(),
                self.bins.ndim()
            )));
        }
        let mut idx = Vec::with_capacity(coords.len());
        for (dim, &c) in self.bins.dims().iter().zip(coords) {
            match dim.index_of(c) {
                Some(i) => idx.push(i),
                None => {
                    return Err(Error::Validation(format!(
                        "coordinate {} lies outside the binning",
                        c
                    )))
                }
            }
        }
        self.get(&idx)
    }

    fn flat_index(&self, idx: &[usize]) -> Result<usize> {
        if idx.len() != self.bins.ndim() {
            return Err(Error::Validation(format!(
                "index tuple has {} entries for a {}-dimensional grid",
                idx.len(),
                self.bins.ndim()
            )));
        }
        let mut flat = 0;
        for (i, (&j, dim)) in idx.iter().zip(self.bins.dims()).enumerate() {
            if j >= dim.count() {
                return Err(Error::Validation(format!(
                    "bin index {} out of range for dimension {} with {} bins",
                    j,
                    i,
                    dim.count()
                )));
            }
            flat = flat * dim.count() + j;
        }
        Ok(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_edges_accessors() {
        let b = BinEdges::new(vec![0.0, 1.0, 3.0]).unwrap();
        assert_eq!(b.count(), 2);
        assert_eq!(b.lower(), &[0.0, 1.0]);
        assert_eq!(b.upper(), &[1.0, 3.0]);
        assert_eq!(b.centres(), vec![0.5, 2.0]);
    }

    #[test]
    fn test_edges_validation() {
        assert!(BinEdges::new(vec![1.0]).is_err());
        assert!(BinEdges::new(vec![0.0, 0.0, 1.0]).is_err());
        assert!(BinEdges::new(vec![0.0, 2.0, 1.0]).is_err());
    }

    #[test]
    fn test_linear_edges() {
        let b = BinEdges::linear(0.0, 10.0, 5).unwrap();
        assert_eq!(b.count(), 5);
        assert_relative_eq!(b.edges()[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(b.edges()[5], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_index_of_half_open() {
        let b = BinEdges::new(vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(b.index_of(0.0), Some(0));
        assert_eq!(b.index_of(0.999), Some(0));
        assert_eq!(b.index_of(1.0), Some(1));
        // the final upper edge is outside every bin
        assert_eq!(b.index_of(2.0), None);
        assert_eq!(b.index_of(-0.1), None);
    }

    #[test]
    fn test_binned_array_1d() {
        let mut a = BinnedArray::new(NdBins::one(BinEdges::new(vec![0.0, 1.0, 2.0]).unwrap()));
        a.set(&[1], 4.0).unwrap();
        assert_eq!(a.get(&[1]).unwrap(), 4.0);
        assert_eq!(a.get(&[0]).unwrap(), 0.0);
        // centre lookup addresses the same cell
        assert_eq!(a.at(&[1.5]).unwrap(), 4.0);
        assert!(a.get(&[2]).is_err());
        assert!(a.at(&[2.0]).is_err());
    }

    #[test]
    fn test_binned_array_2d_layout() {
        let bins = NdBins::two(
            BinEdges::new(vec![0.0, 1.0, 2.0]).unwrap(),
            BinEdges::new(vec![0.0, 10.0, 20.0, 30.0]).unwrap(),
        );
        let mut a = BinnedArray::new(bins);
        assert_eq!(a.values().len(), 6);
        a.set(&[1, 2], 7.0).unwrap();
        assert_eq!(a.get(&[1, 2]).unwrap(), 7.0);
        assert_eq!(a.at(&[1.5, 25.0]).unwrap(), 7.0);
        assert!(a.get(&[1, 3]).is_err());
        assert!(a.get(&[1]).is_err());
    }
}
