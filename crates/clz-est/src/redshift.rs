//! Clustering-redshift estimates from correlation functions.

use std::path::Path;

use clz_core::{read_artifact, write_artifact, ClzError, ErrorInfo, SchemaVersion};
use clz_corr::{jackknife_covariance, write_text_files, Binning, CorrData, CorrFunc, Estimator, ResamplingConfig};
use serde::{Deserialize, Serialize};

use crate::density::DensityEnsemble;
use crate::policy::DensityPolicy;

/// Magic header of redshift estimate files.
pub const REDSHIFT_MAGIC: &[u8] = b"CLZNZDT\0";
/// Current schema of redshift estimate files.
pub const REDSHIFT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Correlation estimator per input; `None` picks the best available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorChoice {
    /// Estimator of the cross-correlation.
    #[serde(default)]
    pub cross_est: Option<Estimator>,
    /// Estimator of the reference autocorrelation.
    #[serde(default)]
    pub ref_est: Option<Estimator>,
    /// Estimator of the unknown autocorrelation.
    #[serde(default)]
    pub unk_est: Option<Estimator>,
}

/// Raw clustering-redshift amplitude per bin with jackknife samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedshiftData {
    /// Redshift bins.
    pub binning: Binning,
    /// Amplitude per bin.
    pub data: Vec<f64>,
    /// Leave-one-patch-out amplitudes, indexed `[sample][bin]`.
    pub samples: Vec<Vec<f64>>,
}

impl RedshiftData {
    /// Combines the cross-correlation with optional autocorrelations.
    ///
    /// Computes `w_sp / sqrt(dz^2 * w_ss * w_pp)` for the values and every
    /// jackknife sample, where a missing autocorrelation counts as 1.
    pub fn from_corrfuncs(
        cross: &CorrFunc,
        ref_corr: Option<&CorrFunc>,
        unk_corr: Option<&CorrFunc>,
        estimators: &EstimatorChoice,
        resampling: &ResamplingConfig,
    ) -> Result<Self, ClzError> {
        for (name, other) in [("reference", ref_corr), ("unknown", unk_corr)] {
            if let Some(other) = other {
                check_compatible(cross, other, name)?;
            }
        }
        let w_sp = cross.sample_with(estimators.cross_est, resampling)?;
        let w_ss = ref_corr
            .map(|corr| corr.sample_with(estimators.ref_est, resampling))
            .transpose()?;
        let w_pp = unk_corr
            .map(|corr| corr.sample_with(estimators.unk_est, resampling))
            .transpose()?;
        if w_ss.is_none() {
            log::debug!("no reference autocorrelation, skipping reference bias correction");
        }
        if w_pp.is_none() {
            log::debug!("no unknown autocorrelation, skipping unknown bias correction");
        }

        let widths = cross.binning.widths();
        let combine = |sp: &[f64], ss: Option<&[f64]>, pp: Option<&[f64]>| -> Vec<f64> {
            (0..sp.len())
                .map(|bin| {
                    let ss = ss.map_or(1.0, |values| values[bin]);
                    let pp = pp.map_or(1.0, |values| values[bin]);
                    sp[bin] / (widths[bin] * widths[bin] * ss * pp).sqrt()
                })
                .collect()
        };
        let term = |corr: &Option<CorrData>, sample: Option<usize>| -> Option<Vec<f64>> {
            corr.as_ref().map(|corr| match sample {
                Some(idx) => corr.samples[idx].clone(),
                None => corr.data.clone(),
            })
        };

        let data = combine(
            &w_sp.data,
            term(&w_ss, None).as_deref(),
            term(&w_pp, None).as_deref(),
        );
        let samples = (0..w_sp.samples.len())
            .map(|idx| {
                combine(
                    &w_sp.samples[idx],
                    term(&w_ss, Some(idx)).as_deref(),
                    term(&w_pp, Some(idx)).as_deref(),
                )
            })
            .collect();
        Ok(Self {
            binning: cross.binning.clone(),
            data,
            samples,
        })
    }

    /// Number of redshift bins.
    pub fn n_bins(&self) -> usize {
        self.binning.n_bins()
    }

    /// Jackknife standard error per bin.
    pub fn error(&self) -> Vec<f64> {
        self.covariance()
            .iter()
            .enumerate()
            .map(|(bin, row)| row[bin].sqrt())
            .collect()
    }

    /// Jackknife covariance between bins.
    pub fn covariance(&self) -> Vec<Vec<f64>> {
        jackknife_covariance(&self.samples)
    }

    /// Applies `policy` to the values and to every sample independently.
    pub fn post_process(&self, policy: &dyn DensityPolicy) -> RedshiftEstimate {
        let mut primary = self.data.clone();
        policy.apply_row(&mut primary);
        let variants = self
            .samples
            .iter()
            .map(|sample| {
                let mut sample = sample.clone();
                policy.apply_row(&mut sample);
                sample
            })
            .collect();
        log::debug!("post-processed redshift estimate with {}", policy.name());
        RedshiftEstimate {
            edges: self.binning.edges().to_vec(),
            primary,
            variants,
        }
    }

    /// Writes `<prefix>.dat`, `<prefix>.smp` and `<prefix>.cov` text files.
    pub fn to_files(&self, prefix: &Path) -> Result<(), ClzError> {
        write_text_files(
            prefix,
            &self.binning,
            &self.data,
            &self.error(),
            &self.samples,
            &self.covariance(),
        )
    }

    /// Writes the estimate to a single binary file.
    pub fn to_file(&self, path: &Path) -> Result<(), ClzError> {
        write_artifact(path, REDSHIFT_MAGIC, REDSHIFT_SCHEMA, self)
    }

    /// Restores an estimate written by [`RedshiftData::to_file`].
    pub fn from_file(path: &Path) -> Result<Self, ClzError> {
        read_artifact(path, REDSHIFT_MAGIC, REDSHIFT_SCHEMA)
    }
}

fn check_compatible(cross: &CorrFunc, auto: &CorrFunc, name: &str) -> Result<(), ClzError> {
    if cross.binning != auto.binning || cross.n_patches() != auto.n_patches() {
        return Err(ClzError::Config(
            ErrorInfo::new("corrfunc-mismatch", "correlation functions are not compatible")
                .with_context("autocorrelation", name)
                .with_context("cross_bins", cross.n_bins().to_string())
                .with_context("auto_bins", auto.n_bins().to_string())
                .with_context("cross_patches", cross.n_patches().to_string())
                .with_context("auto_patches", auto.n_patches().to_string())
                .with_hint("measure all correlations with the same configuration"),
        ));
    }
    Ok(())
}

/// Post-processed estimate: bin edges, primary values and jackknife variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedshiftEstimate {
    /// Monotonic bin edges.
    pub edges: Vec<f64>,
    /// Value per bin.
    pub primary: Vec<f64>,
    /// Jackknife variants, indexed `[variant][bin]`.
    pub variants: Vec<Vec<f64>>,
}

impl RedshiftEstimate {
    /// Normalises every variant to a density over the bin edges.
    pub fn to_density(&self) -> DensityEnsemble {
        DensityEnsemble::from_rows(self.edges.clone(), self.variants.clone())
    }
}

/// Full estimation: combine the correlation functions, then post-process.
pub fn estimate(
    cross: &CorrFunc,
    ref_corr: Option<&CorrFunc>,
    unk_corr: Option<&CorrFunc>,
    estimators: &EstimatorChoice,
    resampling: &ResamplingConfig,
    policy: &dyn DensityPolicy,
) -> Result<(RedshiftData, RedshiftEstimate), ClzError> {
    let data = RedshiftData::from_corrfuncs(cross, ref_corr, unk_corr, estimators, resampling)?;
    let estimate = data.post_process(policy);
    Ok((data, estimate))
}
