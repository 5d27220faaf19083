//! Post-processing applied to every value of a redshift estimate.

use serde::{Deserialize, Serialize};

/// Maps raw estimator values to values usable as a density.
pub trait DensityPolicy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Transforms a single value.
    fn apply(&self, value: f64) -> f64;

    /// Transforms a whole row in place.
    fn apply_row(&self, row: &mut [f64]) {
        for value in row {
            *value = self.apply(*value);
        }
    }
}

/// Non-finite values become zero, then negative values become zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipNegative;

impl DensityPolicy for ClipNegative {
    fn name(&self) -> &'static str {
        "clip-negative"
    }

    fn apply(&self, value: f64) -> f64 {
        if value.is_finite() && value > 0.0 {
            value
        } else {
            0.0
        }
    }
}

/// Only non-finite values become zero; negative amplitudes are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FiniteOnly;

impl DensityPolicy for FiniteOnly {
    fn name(&self) -> &'static str {
        "finite-only"
    }

    fn apply(&self, value: f64) -> f64 {
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

/// Policy selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// [`ClipNegative`].
    #[default]
    ClipNegative,
    /// [`FiniteOnly`].
    FiniteOnly,
}

impl PolicyKind {
    /// The policy implementation.
    pub fn policy(self) -> &'static dyn DensityPolicy {
        match self {
            PolicyKind::ClipNegative => &ClipNegative,
            PolicyKind::FiniteOnly => &FiniteOnly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_negative_zeroes_invalid_values() {
        let mut row = [f64::NAN, -1.0, 0.0, 2.5, f64::INFINITY, f64::NEG_INFINITY];
        ClipNegative.apply_row(&mut row);
        assert_eq!(row, [0.0, 0.0, 0.0, 2.5, 0.0, 0.0]);
    }

    #[test]
    fn finite_only_keeps_negative_values() {
        let mut row = [f64::NAN, -1.0, 2.5];
        FiniteOnly.apply_row(&mut row);
        assert_eq!(row, [0.0, -1.0, 2.5]);
        assert_eq!(PolicyKind::default().policy().name(), "clip-negative");
    }
}
