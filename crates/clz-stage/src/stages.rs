//! The pipeline stages, each configured once from a validated [`StageConfig`].

use std::path::{Path, PathBuf};

use clz_catalog::{ColumnSpec, CorrelationCache, DataSource, PatchSpec};
use clz_core::{ClzError, ErrorInfo};
use clz_corr::{autocorrelate, crosscorrelate, Configuration, CorrFunc};
use clz_est::{
    estimate, DensityEnsemble, EstimatorChoice, PolicyKind, RedshiftData, RedshiftEstimate,
    ResamplingConfig,
};

use crate::config::{StageConfig, StageKind};

fn expect_kind(config: &StageConfig, kind: StageKind) -> Result<(), ClzError> {
    if config.kind() != kind {
        return Err(ClzError::Config(
            ErrorInfo::new("stage-kind", "configuration belongs to another stage")
                .with_context("expected", kind.name())
                .with_context("found", config.kind().name()),
        ));
    }
    Ok(())
}

/// Splits data and optional randoms into patches and stores them in a new cache.
#[derive(Debug, Clone)]
pub struct CacheCreate {
    path: PathBuf,
    overwrite: bool,
    columns: ColumnSpec,
    patches: PatchSpec,
}

impl CacheCreate {
    /// Reads the cache location, columns and patch method; a patch file is
    /// loaded here. Relative paths resolve against `base_dir`.
    pub fn new(config: &StageConfig, base_dir: &Path) -> Result<Self, ClzError> {
        expect_kind(config, StageKind::CacheCreate)?;
        let path = config
            .cache_path()
            .ok_or_else(|| ClzError::config("missing-parameter", "missing required parameter 'path'"))?;
        let path = if path.is_relative() { base_dir.join(path) } else { path };
        Ok(Self {
            path,
            overwrite: config.overwrite(),
            columns: config.columns(),
            patches: config.patch_spec(base_dir)?,
        })
    }

    /// Cache root this stage creates.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the cache.
    ///
    /// Centers of `patch_source` replace any patch file. Randoms are stored
    /// first so the data is split with their centers. If any step fails the
    /// new cache directory is removed.
    pub fn run(
        &self,
        data: DataSource<'_>,
        rand: Option<DataSource<'_>>,
        patch_source: Option<&CorrelationCache>,
    ) -> Result<CorrelationCache, ClzError> {
        let mut patches = self.patches.clone();
        if let Some(source) = patch_source {
            log::info!("using patch centers of {}", source.path().display());
            patches.centers = Some(source.patch_centers()?);
        }
        let cache = CorrelationCache::create_with(&self.path, self.overwrite, |cache| {
            if let Some(rand) = rand {
                log::info!("storing randoms");
                cache.rand_mut().set(rand, &self.columns, &patches, false)?;
            }
            log::info!("storing data");
            cache.data_mut().set(data, &self.columns, &patches, false)?;
            cache.check_consistency()
        })?;
        log::info!("cache ready with {} patches", cache.n_patches()?);
        Ok(cache)
    }
}

/// Removes a cache directory.
#[derive(Debug, Clone, Default)]
pub struct CacheDrop;

impl CacheDrop {
    /// Checks the configuration.
    pub fn new(config: &StageConfig) -> Result<Self, ClzError> {
        expect_kind(config, StageKind::CacheDrop)?;
        Ok(Self)
    }

    /// Drops the cache at `path`; a missing path is not an error.
    pub fn run(&self, path: &Path) -> Result<(), ClzError> {
        if !path.exists() {
            log::debug!("nothing to drop at {}", path.display());
            return Ok(());
        }
        CorrelationCache::open(path)?.drop()
    }
}

/// Autocorrelation of one cache.
#[derive(Debug, Clone)]
pub struct AutoCorrelate {
    config: Configuration,
}

impl AutoCorrelate {
    /// Builds the measurement configuration.
    pub fn new(config: &StageConfig) -> Result<Self, ClzError> {
        expect_kind(config, StageKind::AutoCorrelate)?;
        Ok(Self { config: config.correlation()? })
    }

    /// Measurement configuration.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Measures the autocorrelation; the cache must hold randoms.
    pub fn run(&self, sample: &CorrelationCache) -> Result<CorrFunc, ClzError> {
        autocorrelate(sample, &self.config)
    }
}

/// Cross-correlation of a reference cache with an unknown cache.
#[derive(Debug, Clone)]
pub struct CrossCorrelate {
    config: Configuration,
}

impl CrossCorrelate {
    /// Builds the measurement configuration.
    pub fn new(config: &StageConfig) -> Result<Self, ClzError> {
        expect_kind(config, StageKind::CrossCorrelate)?;
        Ok(Self { config: config.correlation()? })
    }

    /// Measurement configuration.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Measures the cross-correlation; at least one cache must hold randoms.
    pub fn run(&self, reference: &CorrelationCache, unknown: &CorrelationCache) -> Result<CorrFunc, ClzError> {
        crosscorrelate(reference, unknown, &self.config)
    }
}

/// Everything produced by [`Summarize`].
#[derive(Debug, Clone)]
pub struct Summary {
    /// Redshift estimate with its jackknife samples.
    pub data: RedshiftData,
    /// Post-processed estimate.
    pub estimate: RedshiftEstimate,
    /// Normalised densities, one per jackknife variant.
    pub density: DensityEnsemble,
}

/// Turns correlation functions into a redshift density.
#[derive(Debug, Clone)]
pub struct Summarize {
    estimators: EstimatorChoice,
    resampling: ResamplingConfig,
    policy: PolicyKind,
}

impl Summarize {
    /// Reads estimators, resampling and post-processing options.
    pub fn new(config: &StageConfig) -> Result<Self, ClzError> {
        expect_kind(config, StageKind::Summarize)?;
        Ok(Self {
            estimators: config.estimators()?,
            resampling: config.resampling(),
            policy: config.policy()?,
        })
    }

    /// Combines the cross-correlation with the optional autocorrelations.
    pub fn run(
        &self,
        cross: &CorrFunc,
        ref_corr: Option<&CorrFunc>,
        unk_corr: Option<&CorrFunc>,
    ) -> Result<Summary, ClzError> {
        if ref_corr.is_none() && unk_corr.is_none() {
            log::warn!("no autocorrelation given, the estimate is not bias corrected");
        }
        let policy = self.policy.policy();
        let (data, estimate) = estimate(cross, ref_corr, unk_corr, &self.estimators, &self.resampling, policy)?;
        let density = estimate.to_density();
        log::info!(
            "estimated {} bins with {} jackknife variants ({})",
            data.n_bins(),
            density.len(),
            policy.name()
        );
        Ok(Summary { data, estimate, density })
    }
}
