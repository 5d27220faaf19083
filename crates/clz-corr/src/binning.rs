//! Redshift bin edges.

use clz_core::{ClzError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// Contiguous redshift bins defined by monotonic edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binning {
    edges: Vec<f64>,
}

impl Binning {
    /// Wraps explicit edges; at least two strictly increasing finite values.
    pub fn from_edges(edges: Vec<f64>) -> Result<Self, ClzError> {
        let increasing = edges.windows(2).all(|pair| pair[0] < pair[1]);
        if edges.len() < 2 || !increasing || edges.iter().any(|edge| !edge.is_finite()) {
            return Err(ClzError::Config(
                ErrorInfo::new("zbins", "redshift bin edges must be finite and strictly increasing")
                    .with_context("edges", edges.len().to_string()),
            ));
        }
        Ok(Self { edges })
    }

    /// Bin edges.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Midpoints of the bins.
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|pair| 0.5 * (pair[0] + pair[1])).collect()
    }

    /// Widths of the bins.
    pub fn widths(&self) -> Vec<f64> {
        self.edges.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }

    /// Lower edge, upper edge pairs.
    pub fn intervals(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.edges.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Index of the bin containing `z`; bins are closed on the left.
    pub fn find(&self, z: f64) -> Option<usize> {
        let last = *self.edges.last()?;
        if !(z >= self.edges[0] && z < last) {
            return None;
        }
        Some(self.edges.partition_point(|&edge| edge <= z) - 1)
    }
}
