//! Measurement configuration: scales, redshift binning, backend and cosmology.

use serde::{Deserialize, Serialize};

use clz_core::{ClzError, ErrorInfo};

use crate::binning::Binning;
use crate::cosmology::Cosmology;

/// Physical scales of the measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalesConfig {
    /// Lower separation limit in kpc.
    pub rmin: f64,
    /// Upper separation limit in kpc.
    pub rmax: f64,
    /// Power-law exponent applied to the separation of each pair.
    #[serde(default)]
    pub rweight: Option<f64>,
    /// Logarithmic separation bins used to evaluate `rweight`.
    #[serde(default = "default_rbin_num")]
    pub rbin_num: usize,
}

fn default_rbin_num() -> usize {
    50
}

impl ScalesConfig {
    /// Scales between `rmin` and `rmax` kpc without pair weighting.
    pub fn new(rmin: f64, rmax: f64) -> Self {
        Self {
            rmin,
            rmax,
            rweight: None,
            rbin_num: default_rbin_num(),
        }
    }

    fn validate(&self) -> Result<(), ClzError> {
        if !(self.rmin > 0.0 && self.rmin < self.rmax && self.rmax.is_finite()) {
            return Err(ClzError::Config(
                ErrorInfo::new("scales", "scales require 0 < rmin < rmax")
                    .with_context("rmin", self.rmin.to_string())
                    .with_context("rmax", self.rmax.to_string()),
            ));
        }
        if self.rweight.is_some() && self.rbin_num == 0 {
            return Err(ClzError::config("rbin_num", "rbin_num must be positive"));
        }
        Ok(())
    }

    /// Weight of a pair at projected separation `r` kpc.
    pub fn pair_weight(&self, r: f64) -> f64 {
        let Some(power) = self.rweight else {
            return 1.0;
        };
        let (log_min, log_max) = (self.rmin.ln(), self.rmax.ln());
        let step = (log_max - log_min) / self.rbin_num as f64;
        let bin = (((r.ln() - log_min) / step).floor().max(0.0) as usize).min(self.rbin_num - 1);
        let center = (log_min + (bin as f64 + 0.5) * step).exp();
        center.powf(power)
    }
}

/// How redshift bin edges are spaced between `zmin` and `zmax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinningMethod {
    /// Equal steps in redshift.
    #[default]
    Linear,
    /// Equal steps in comoving distance.
    Comoving,
    /// Equal steps in ln(1 + z).
    Logspace,
}

/// Redshift binning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningConfig {
    /// Lowest redshift edge.
    #[serde(default)]
    pub zmin: Option<f64>,
    /// Highest redshift edge.
    #[serde(default)]
    pub zmax: Option<f64>,
    /// Number of bins.
    #[serde(default = "default_zbin_num")]
    pub zbin_num: usize,
    /// Spacing of generated edges.
    #[serde(default)]
    pub method: BinningMethod,
    /// Explicit edges; take precedence over the generated ones.
    #[serde(default)]
    pub zbins: Option<Vec<f64>>,
}

fn default_zbin_num() -> usize {
    30
}

impl BinningConfig {
    /// Linear bins between `zmin` and `zmax`.
    pub fn new(zmin: f64, zmax: f64) -> Self {
        Self {
            zmin: Some(zmin),
            zmax: Some(zmax),
            zbin_num: default_zbin_num(),
            method: BinningMethod::default(),
            zbins: None,
        }
    }

    /// Explicit bin edges.
    pub fn from_edges(zbins: Vec<f64>) -> Self {
        Self {
            zmin: None,
            zmax: None,
            zbin_num: zbins.len().saturating_sub(1),
            method: BinningMethod::default(),
            zbins: Some(zbins),
        }
    }

    /// Builds the bin edges.
    pub fn binning(&self, cosmology: &Cosmology) -> Result<Binning, ClzError> {
        if let Some(edges) = &self.zbins {
            return Binning::from_edges(edges.clone());
        }
        let (Some(zmin), Some(zmax)) = (self.zmin, self.zmax) else {
            return Err(ClzError::Config(
                ErrorInfo::new("binning", "either zbins or both zmin and zmax are required")
                    .with_hint("set zmin and zmax, or list the bin edges in zbins"),
            ));
        };
        if !(zmin >= 0.0 && zmin < zmax) || self.zbin_num == 0 {
            return Err(ClzError::Config(
                ErrorInfo::new("binning", "binning requires 0 <= zmin < zmax and zbin_num > 0")
                    .with_context("zmin", zmin.to_string())
                    .with_context("zmax", zmax.to_string())
                    .with_context("zbin_num", self.zbin_num.to_string()),
            ));
        }
        let n = self.zbin_num;
        let steps = |lo: f64, hi: f64| -> Vec<f64> {
            (0..=n).map(|idx| lo + (hi - lo) * idx as f64 / n as f64).collect()
        };
        let mut edges = match self.method {
            BinningMethod::Linear => steps(zmin, zmax),
            BinningMethod::Logspace => steps(zmin.ln_1p(), zmax.ln_1p())
                .into_iter()
                .map(f64::exp_m1)
                .collect(),
            BinningMethod::Comoving => {
                steps(cosmology.comoving_distance(zmin), cosmology.comoving_distance(zmax))
                    .into_iter()
                    .map(|distance| cosmology.redshift_at_comoving_distance(distance))
                    .collect()
            }
        };
        // pin the outer edges against round-off from the transforms
        edges[0] = zmin;
        edges[n] = zmax;
        Binning::from_edges(edges)
    }
}

/// Parallelism of the pair counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Count pairs between different patches.
    #[serde(default = "default_crosspatch")]
    pub crosspatch: bool,
    /// Worker threads; all cores when unset.
    #[serde(default)]
    pub thread_num: Option<usize>,
}

fn default_crosspatch() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            crosspatch: default_crosspatch(),
            thread_num: None,
        }
    }
}

/// Complete measurement configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Separation limits.
    pub scales: ScalesConfig,
    /// Redshift binning.
    pub binning: BinningConfig,
    /// Pair counting backend.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Distance model.
    #[serde(default)]
    pub cosmology: Cosmology,
}

impl Configuration {
    /// Validates and assembles a configuration.
    pub fn create(
        scales: ScalesConfig,
        binning: BinningConfig,
        backend: BackendConfig,
        cosmology: Cosmology,
    ) -> Result<Self, ClzError> {
        let config = Self {
            scales,
            binning,
            backend,
            cosmology,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every section.
    pub fn validate(&self) -> Result<(), ClzError> {
        self.scales.validate()?;
        self.cosmology.validate()?;
        self.binning.binning(&self.cosmology)?;
        if self.backend.thread_num == Some(0) {
            return Err(ClzError::config("thread_num", "thread_num must be positive"));
        }
        Ok(())
    }

    /// Redshift bins of the measurement.
    pub fn redshift_binning(&self) -> Result<Binning, ClzError> {
        self.binning.binning(&self.cosmology)
    }
}
