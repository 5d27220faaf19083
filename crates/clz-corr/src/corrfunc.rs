//! Correlation functions built from pair counts and their jackknife samples.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use clz_core::{read_artifact, write_artifact, ClzError, ErrorInfo, SchemaVersion};
use serde::{Deserialize, Serialize};

use crate::binning::Binning;
use crate::counts::PairCounts;

/// Magic header of correlation function files.
pub const CORRFUNC_MAGIC: &[u8] = b"CLZCORR\0";
/// Current schema of correlation function files.
pub const CORRFUNC_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Correlation estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Estimator {
    /// Landy-Szalay, requires random-random counts.
    #[serde(rename = "LS")]
    LandySzalay,
    /// Davis-Peebles, uses one data-random term.
    #[serde(rename = "DP")]
    DavisPeebles,
}

/// Resampling method for error estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    /// Leave one patch out.
    #[default]
    Jackknife,
}

/// How samples are formed from patch-resolved counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResamplingConfig {
    /// Resampling method.
    #[serde(default)]
    pub method: ResamplingMethod,
    /// Include pairs from different patches.
    #[serde(default = "default_crosspatch")]
    pub crosspatch: bool,
}

fn default_crosspatch() -> bool {
    true
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self {
            method: ResamplingMethod::default(),
            crosspatch: default_crosspatch(),
        }
    }
}

/// Pair counts of one measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrFunc {
    /// Redshift bins of all terms.
    pub binning: Binning,
    /// Data-data counts.
    pub dd: PairCounts,
    /// Data-random counts, randoms of the second sample.
    pub dr: Option<PairCounts>,
    /// Random-data counts, randoms of the first sample.
    pub rd: Option<PairCounts>,
    /// Random-random counts.
    pub rr: Option<PairCounts>,
}

impl CorrFunc {
    /// Number of patches.
    pub fn n_patches(&self) -> usize {
        self.dd.n_patches()
    }

    /// Number of redshift bins.
    pub fn n_bins(&self) -> usize {
        self.binning.n_bins()
    }

    /// Landy-Szalay if random-random counts exist, Davis-Peebles otherwise.
    pub fn default_estimator(&self) -> Estimator {
        if self.rr.is_some() {
            Estimator::LandySzalay
        } else {
            Estimator::DavisPeebles
        }
    }

    /// Evaluates the estimator for all bins and jackknife samples.
    pub fn sample(&self, estimator: Option<Estimator>) -> Result<CorrData, ClzError> {
        self.sample_with(estimator, &ResamplingConfig::default())
    }

    /// Like [`CorrFunc::sample`] with explicit resampling options.
    pub fn sample_with(
        &self,
        estimator: Option<Estimator>,
        resampling: &ResamplingConfig,
    ) -> Result<CorrData, ClzError> {
        let estimator = estimator.unwrap_or_else(|| self.default_estimator());
        let crosspatch = resampling.crosspatch;
        let term = |counts: &PairCounts| {
            (counts.normalised_with(crosspatch), counts.jackknife_with(crosspatch))
        };
        let dd = term(&self.dd);
        let dr = self.dr.as_ref().map(term);
        let rd = self.rd.as_ref().map(term);
        let rr = self.rr.as_ref().map(term);

        let data = apply_estimator(
            estimator,
            &dd.0,
            dr.as_ref().map(|term| term.0.as_slice()),
            rd.as_ref().map(|term| term.0.as_slice()),
            rr.as_ref().map(|term| term.0.as_slice()),
        )?;
        let samples = (0..self.n_patches())
            .map(|patch| {
                apply_estimator(
                    estimator,
                    &dd.1[patch],
                    dr.as_ref().map(|term| term.1[patch].as_slice()),
                    rd.as_ref().map(|term| term.1[patch].as_slice()),
                    rr.as_ref().map(|term| term.1[patch].as_slice()),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CorrData {
            binning: self.binning.clone(),
            data,
            samples,
        })
    }

    /// Writes the counts to a single binary file.
    pub fn to_file(&self, path: &Path) -> Result<(), ClzError> {
        write_artifact(path, CORRFUNC_MAGIC, CORRFUNC_SCHEMA, self)
    }

    /// Restores counts written by [`CorrFunc::to_file`].
    pub fn from_file(path: &Path) -> Result<Self, ClzError> {
        read_artifact(path, CORRFUNC_MAGIC, CORRFUNC_SCHEMA)
    }
}

fn apply_estimator(
    estimator: Estimator,
    dd: &[f64],
    dr: Option<&[f64]>,
    rd: Option<&[f64]>,
    rr: Option<&[f64]>,
) -> Result<Vec<f64>, ClzError> {
    match estimator {
        Estimator::DavisPeebles => {
            let Some(random) = dr.or(rd) else {
                return Err(no_random_term());
            };
            Ok(dd.iter().zip(random).map(|(dd, dr)| dd / dr - 1.0).collect())
        }
        Estimator::LandySzalay => {
            let Some(rr) = rr else {
                return Err(ClzError::Config(
                    ErrorInfo::new("estimator", "Landy-Szalay requires random-random counts")
                        .with_hint("use the Davis-Peebles estimator"),
                ));
            };
            let (dr, rd) = match (dr, rd) {
                (Some(dr), Some(rd)) => (dr, rd),
                (Some(dr), None) => (dr, dr),
                (None, Some(rd)) => (rd, rd),
                (None, None) => return Err(no_random_term()),
            };
            Ok((0..dd.len())
                .map(|bin| (dd[bin] - dr[bin] - rd[bin] + rr[bin]) / rr[bin])
                .collect())
        }
    }
}

fn no_random_term() -> ClzError {
    ClzError::config("estimator", "correlation function has no data-random counts")
}

/// Estimator values per redshift bin with their jackknife samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrData {
    /// Redshift bins.
    pub binning: Binning,
    /// Value per bin.
    pub data: Vec<f64>,
    /// Leave-one-patch-out values, indexed `[sample][bin]`.
    pub samples: Vec<Vec<f64>>,
}

impl CorrData {
    /// Jackknife standard error per bin.
    pub fn error(&self) -> Vec<f64> {
        jackknife_covariance(&self.samples)
            .iter()
            .enumerate()
            .map(|(bin, row)| row[bin].sqrt())
            .collect()
    }

    /// Jackknife covariance between bins.
    pub fn covariance(&self) -> Vec<Vec<f64>> {
        jackknife_covariance(&self.samples)
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
}

/// Covariance of jackknife samples indexed `[sample][bin]`.
///
/// Uses the `(n - 1) / n` jackknife prefactor; with fewer than two samples
/// the covariance is all zero.
pub fn jackknife_covariance(samples: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n_samples = samples.len();
    let n_bins = samples.first().map_or(0, Vec::len);
    if n_samples < 2 {
        return vec![vec![0.0; n_bins]; n_bins];
    }
    let mean: Vec<f64> = (0..n_bins)
        .map(|bin| samples.iter().map(|sample| sample[bin]).sum::<f64>() / n_samples as f64)
        .collect();
    let prefactor = (n_samples as f64 - 1.0) / n_samples as f64;
    (0..n_bins)
        .map(|a| {
            (0..n_bins)
                .map(|b| {
                    prefactor
                        * samples
                            .iter()
                            .map(|sample| (sample[a] - mean[a]) * (sample[b] - mean[b]))
                            .sum::<f64>()
                })
                .collect()
        })
        .collect()
}

/// Writes the three text outputs shared by correlation and redshift data.
pub fn write_text_files(
    prefix: &Path,
    binning: &Binning,
    values: &[f64],
    errors: &[f64],
    samples: &[Vec<f64>],
    covariance: &[Vec<f64>],
) -> Result<(), ClzError> {
    let mut dat = String::from("# z_low z_high value error\n");
    for (bin, (lo, hi)) in binning.intervals().enumerate() {
        let _ = writeln!(dat, "{lo:.6} {hi:.6} {:+.6e} {:.6e}", values[bin], errors[bin]);
    }

    let mut smp = String::from("# z_low z_high");
    for idx in 0..samples.len() {
        let _ = write!(smp, " jack_{idx}");
    }
    smp.push('\n');
    for (bin, (lo, hi)) in binning.intervals().enumerate() {
        let _ = write!(smp, "{lo:.6} {hi:.6}");
        for sample in samples {
            let _ = write!(smp, " {:+.6e}", sample[bin]);
        }
        smp.push('\n');
    }

    let mut cov = String::new();
    for row in covariance {
        let line: Vec<String> = row.iter().map(|value| format!("{value:+.6e}")).collect();
        cov.push_str(&line.join(" "));
        cov.push('\n');
    }

    for (extension, text) in [("dat", dat), ("smp", smp), ("cov", cov)] {
        let path = with_extension(prefix, extension);
        fs::write(&path, text).map_err(|err| ClzError::from_io("text-write", &path, err))?;
    }
    Ok(())
}

fn with_extension(prefix: &Path, extension: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covariance_of_identical_samples_is_zero() {
        let samples = vec![vec![1.0, 2.0]; 4];
        let cov = jackknife_covariance(&samples);
        assert_eq!(cov, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn variance_uses_jackknife_prefactor() {
        let samples = vec![vec![1.0], vec![3.0]];
        // mean 2, squared deviations 1 + 1, prefactor 1/2
        assert_eq!(jackknife_covariance(&samples), vec![vec![1.0]]);
    }

    #[test]
    fn extension_is_appended() {
        assert_eq!(
            with_extension(Path::new("out/w_sp"), "dat"),
            PathBuf::from("out/w_sp.dat")
        );
        assert_eq!(
            with_extension(Path::new("out/w.sp"), "cov"),
            PathBuf::from("out/w.sp.cov")
        );
    }
}
