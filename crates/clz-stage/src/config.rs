//! Stage kinds and their validated configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use clz_catalog::{normalise_path, patch_centers_from_file, ColumnSpec, PatchSpec};
use clz_core::{ClzError, ErrorInfo};
use clz_corr::{
    BackendConfig, BinningConfig, BinningMethod, Configuration, Cosmology, Estimator,
    ScalesConfig,
};
use clz_est::{EstimatorChoice, PolicyKind, ResamplingConfig};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::params::{
    ParamDefault, ParamKind, ParamSpec, BACKEND_PARAMS, BINNING_PARAMS, CACHE_PARAMS,
    COLUMN_PARAMS, ESTIMATOR_PARAMS, PATCH_PARAMS, SCALE_PARAMS, SUMMARY_PARAMS, VERBOSE_PARAMS,
};

/// The pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Split data and randoms into patches and cache them.
    CacheCreate,
    /// Remove a cache directory.
    CacheDrop,
    /// Autocorrelation of one cache.
    AutoCorrelate,
    /// Cross-correlation of a reference and an unknown cache.
    CrossCorrelate,
    /// Turn correlation functions into a redshift density.
    Summarize,
}

/// An input slot of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Tag used in pipeline files.
    pub tag: &'static str,
    /// Whether the stage fails without it.
    pub required: bool,
}

impl StageKind {
    /// All stage kinds.
    pub const ALL: [StageKind; 5] = [
        StageKind::CacheCreate,
        StageKind::CacheDrop,
        StageKind::AutoCorrelate,
        StageKind::CrossCorrelate,
        StageKind::Summarize,
    ];

    /// Name used in pipeline files.
    pub fn name(self) -> &'static str {
        match self {
            StageKind::CacheCreate => "cache_create",
            StageKind::CacheDrop => "cache_drop",
            StageKind::AutoCorrelate => "auto_correlate",
            StageKind::CrossCorrelate => "cross_correlate",
            StageKind::Summarize => "summarize",
        }
    }

    /// Parameter groups accepted by the stage.
    pub fn param_groups(self) -> &'static [&'static [ParamSpec]] {
        match self {
            StageKind::CacheCreate => &[CACHE_PARAMS, COLUMN_PARAMS, PATCH_PARAMS, VERBOSE_PARAMS],
            StageKind::CacheDrop => &[VERBOSE_PARAMS],
            StageKind::AutoCorrelate | StageKind::CrossCorrelate => {
                &[SCALE_PARAMS, BINNING_PARAMS, BACKEND_PARAMS, VERBOSE_PARAMS]
            }
            StageKind::Summarize => &[ESTIMATOR_PARAMS, SUMMARY_PARAMS, VERBOSE_PARAMS],
        }
    }

    /// Every parameter accepted by the stage.
    pub fn params(self) -> impl Iterator<Item = &'static ParamSpec> {
        self.param_groups().iter().flat_map(|group| group.iter())
    }

    /// Input slots.
    pub fn inputs(self) -> &'static [Slot] {
        match self {
            StageKind::CacheCreate => &[
                Slot { tag: "data", required: true },
                Slot { tag: "rand", required: false },
                Slot { tag: "patch_source", required: false },
            ],
            StageKind::CacheDrop => &[Slot { tag: "cache", required: true }],
            StageKind::AutoCorrelate => &[Slot { tag: "sample", required: true }],
            StageKind::CrossCorrelate => &[Slot { tag: "reference", required: true }, Slot { tag: "unknown", required: true }],
            StageKind::Summarize => &[
                Slot { tag: "cross_corr", required: true },
                Slot { tag: "auto_corr_ref", required: false },
                Slot { tag: "auto_corr_unk", required: false },
            ],
        }
    }

    /// Output slots; all of them are written by a successful run.
    pub fn outputs(self) -> &'static [&'static str] {
        match self {
            StageKind::CacheCreate => &["cache"],
            StageKind::CacheDrop => &[],
            StageKind::AutoCorrelate => &["auto_corr"],
            StageKind::CrossCorrelate => &["cross_corr"],
            StageKind::Summarize => &["output", "estimate"],
        }
    }
}

/// Checks the static parameter table: unique names per stage and defaults
/// that match their declared kind.
pub fn check_param_table() -> Result<(), ClzError> {
    for kind in StageKind::ALL {
        let mut seen = BTreeSet::new();
        for spec in kind.params() {
            if !seen.insert(spec.name) {
                return Err(ClzError::Config(
                    ErrorInfo::new("param-table", "duplicate parameter")
                        .with_context("stage", kind.name())
                        .with_context("parameter", spec.name),
                ));
            }
            let matches = match (spec.kind, spec.default) {
                (_, None) => true,
                (ParamKind::Str, Some(ParamDefault::Str(_)))
                | (ParamKind::Int, Some(ParamDefault::Int(_)))
                | (ParamKind::Float, Some(ParamDefault::Float(_)))
                | (ParamKind::Bool, Some(ParamDefault::Bool(_))) => true,
                _ => false,
            };
            if !matches || (spec.required && spec.default.is_some()) {
                return Err(ClzError::Config(
                    ErrorInfo::new("param-table", "parameter default does not match its kind")
                        .with_context("stage", kind.name())
                        .with_context("parameter", spec.name),
                ));
            }
        }
    }
    Ok(())
}

fn default_value(default: ParamDefault) -> Value {
    match default {
        ParamDefault::Str(text) => Value::from(text),
        ParamDefault::Int(value) => Value::from(value),
        ParamDefault::Float(value) => Value::from(value),
        ParamDefault::Bool(value) => Value::from(value),
    }
}

fn has_kind(kind: ParamKind, value: &Value) -> bool {
    match kind {
        ParamKind::Str => value.is_string(),
        ParamKind::Int => value.is_u64(),
        ParamKind::Float => value.is_number(),
        ParamKind::Bool => value.is_bool(),
        ParamKind::FloatList => value
            .as_sequence()
            .is_some_and(|items| items.iter().all(Value::is_number)),
    }
}

/// Configuration of one stage, validated against the parameter table.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    kind: StageKind,
    values: BTreeMap<&'static str, Value>,
}

impl StageConfig {
    /// Validates a YAML mapping; `null` is treated as an empty mapping.
    ///
    /// Unknown keys, missing required keys and values of the wrong type are
    /// rejected. Absent optional keys take their table default.
    pub fn from_yaml_value(kind: StageKind, value: &Value) -> Result<Self, ClzError> {
        let empty = serde_yaml::Mapping::new();
        let mapping = match value {
            Value::Null => &empty,
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(ClzError::Config(
                    ErrorInfo::new("config-mapping", "stage configuration must be a mapping")
                        .with_context("stage", kind.name()),
                ))
            }
        };

        let mut values = BTreeMap::new();
        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                return Err(ClzError::Config(
                    ErrorInfo::new("config-key", "configuration keys must be strings")
                        .with_context("stage", kind.name()),
                ));
            };
            let Some(spec) = kind.params().find(|spec| spec.name == key) else {
                let known: Vec<&str> = kind.params().map(|spec| spec.name).collect();
                return Err(ClzError::Config(
                    ErrorInfo::new("unknown-parameter", format!("unknown parameter '{key}'"))
                        .with_context("stage", kind.name())
                        .with_hint(format!("accepted parameters: {}", known.join(", "))),
                ));
            };
            if value.is_null() {
                continue;
            }
            if !has_kind(spec.kind, value) {
                return Err(ClzError::Config(
                    ErrorInfo::new("parameter-type", format!("parameter '{key}' must be a {}", spec.kind))
                        .with_context("stage", kind.name())
                        .with_context("help", spec.help),
                ));
            }
            values.insert(spec.name, value.clone());
        }

        for spec in kind.params() {
            if values.contains_key(spec.name) {
                continue;
            }
            if spec.required {
                return Err(ClzError::Config(
                    ErrorInfo::new("missing-parameter", format!("missing required parameter '{}'", spec.name))
                        .with_context("stage", kind.name())
                        .with_context("help", spec.help),
                ));
            }
            if let Some(default) = spec.default {
                values.insert(spec.name, default_value(default));
            }
        }
        Ok(Self { kind, values })
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(kind: StageKind, text: &str) -> Result<Self, ClzError> {
        let value: Value = serde_yaml::from_str(text).map_err(|err| {
            ClzError::Serde(ErrorInfo::new("config-yaml", err.to_string()).with_context("stage", kind.name()))
        })?;
        Self::from_yaml_value(kind, &value)
    }

    /// Stage this configuration belongs to.
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Raw value of a parameter.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Text parameter.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    /// Float parameter.
    pub fn float(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(Value::as_f64)
    }

    /// Integer parameter.
    pub fn int(&self, name: &str) -> Option<u64> {
        self.value(name).and_then(Value::as_u64)
    }

    /// Boolean parameter.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(Value::as_bool)
    }

    /// Float list parameter.
    pub fn floats(&self, name: &str) -> Option<Vec<f64>> {
        self.value(name)
            .and_then(Value::as_sequence)
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
    }

    /// Log level requested for the stage.
    pub fn verbose(&self) -> &str {
        self.str("verbose").unwrap_or("info")
    }

    /// Cache directory of a `cache_create` stage.
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.str("path").map(|path| normalise_path(Path::new(path)))
    }

    /// Whether an existing cache may be replaced.
    pub fn overwrite(&self) -> bool {
        self.bool("overwrite").unwrap_or(false)
    }

    /// Column names.
    pub fn columns(&self) -> ColumnSpec {
        let defaults = ColumnSpec::default();
        ColumnSpec {
            ra: self.str("ra_name").map_or(defaults.ra, str::to_string),
            dec: self.str("dec_name").map_or(defaults.dec, str::to_string),
            redshift: self.str("redshift_name").map(str::to_string),
            weight: self.str("weight_name").map(str::to_string),
        }
    }

    /// Patch creation parameters; a patch file is read here, a relative one
    /// from `base_dir`.
    pub fn patch_spec(&self, base_dir: &Path) -> Result<PatchSpec, ClzError> {
        let centers = match self.str("patch_file") {
            Some(path) => {
                let path = normalise_path(Path::new(path));
                let path = if path.is_relative() { base_dir.join(path) } else { path };
                Some(patch_centers_from_file(&path)?)
            }
            None => None,
        };
        let mut spec = PatchSpec {
            centers,
            column: self.str("patch_name").map(str::to_string),
            count: self.int("n_patches").map(|count| count as usize),
            ..PatchSpec::default()
        };
        if let Some(seed) = self.int("seed") {
            spec.seed = seed;
        }
        Ok(spec)
    }

    /// Correlation measurement configuration.
    pub fn correlation(&self) -> Result<Configuration, ClzError> {
        let scales = ScalesConfig {
            rmin: self.float("rmin").unwrap_or_default(),
            rmax: self.float("rmax").unwrap_or_default(),
            rweight: self.float("rweight"),
            rbin_num: self.int("rbin_num").unwrap_or(50) as usize,
        };
        let method = match self.str("method").unwrap_or("linear") {
            "linear" => BinningMethod::Linear,
            "comoving" => BinningMethod::Comoving,
            "logspace" => BinningMethod::Logspace,
            other => {
                return Err(ClzError::Config(
                    ErrorInfo::new("method", format!("unknown binning method '{other}'"))
                        .with_hint("use linear, comoving or logspace"),
                ))
            }
        };
        let binning = BinningConfig {
            zmin: self.float("zmin"),
            zmax: self.float("zmax"),
            zbin_num: self.int("zbin_num").unwrap_or(30) as usize,
            method,
            zbins: self.floats("zbins"),
        };
        let backend = BackendConfig {
            crosspatch: self.bool("crosspatch").unwrap_or(true),
            thread_num: self.int("thread_num").map(|threads| threads as usize),
        };
        Configuration::create(scales, binning, backend, Cosmology::default())
    }

    /// Estimator per correlation function.
    pub fn estimators(&self) -> Result<EstimatorChoice, ClzError> {
        let parse = |name: &str| -> Result<Option<Estimator>, ClzError> {
            match self.str(name) {
                None => Ok(None),
                Some("LS") => Ok(Some(Estimator::LandySzalay)),
                Some("DP") => Ok(Some(Estimator::DavisPeebles)),
                Some(other) => Err(ClzError::Config(
                    ErrorInfo::new("estimator", format!("unknown estimator '{other}'"))
                        .with_context("parameter", name)
                        .with_hint("use LS or DP"),
                )),
            }
        };
        Ok(EstimatorChoice {
            cross_est: parse("cross_est")?,
            ref_est: parse("ref_est")?,
            unk_est: parse("unk_est")?,
        })
    }

    /// Resampling options of the estimate.
    pub fn resampling(&self) -> ResamplingConfig {
        ResamplingConfig {
            crosspatch: self.bool("crosspatch").unwrap_or(true),
            ..ResamplingConfig::default()
        }
    }

    /// Post-processing policy of the estimate.
    pub fn policy(&self) -> Result<PolicyKind, ClzError> {
        match self.str("policy").unwrap_or("clip-negative") {
            "clip-negative" => Ok(PolicyKind::ClipNegative),
            "finite-only" => Ok(PolicyKind::FiniteOnly),
            other => Err(ClzError::Config(
                ErrorInfo::new("policy", format!("unknown post-processing policy '{other}'"))
                    .with_hint("use clip-negative or finite-only"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_table_is_consistent() {
        check_param_table().unwrap();
    }

    #[test]
    fn defaults_are_filled_in() {
        let config = StageConfig::from_yaml_str(StageKind::CacheCreate, "path: /tmp/cache\n").unwrap();
        assert_eq!(config.str("ra_name"), Some("ra"));
        assert_eq!(config.int("seed"), Some(12345));
        assert!(!config.overwrite());
        assert_eq!(config.verbose(), "info");
        assert_eq!(config.str("redshift_name"), None);
    }

    #[test]
    fn unknown_and_missing_keys_are_rejected() {
        let err = StageConfig::from_yaml_str(StageKind::CacheCreate, "path: x\nnpatches: 3\n").unwrap_err();
        assert_eq!(err.info().code, "unknown-parameter");
        let err = StageConfig::from_yaml_str(StageKind::CacheCreate, "overwrite: true\n").unwrap_err();
        assert_eq!(err.info().code, "missing-parameter");
        let err = StageConfig::from_yaml_str(StageKind::AutoCorrelate, "rmin: 100\nrmax: a\n").unwrap_err();
        assert_eq!(err.info().code, "parameter-type");
    }

    #[test]
    fn correlation_config_is_built() {
        let config = StageConfig::from_yaml_str(
            StageKind::CrossCorrelate,
            "rmin: 100\nrmax: 1000\nzmin: 0.1\nzmax: 1.0\nzbin_num: 8\nthread_num: 2\n",
        )
        .unwrap();
        let corr = config.correlation().unwrap();
        assert_eq!(corr.scales.rmin, 100.0);
        assert_eq!(corr.binning.zbin_num, 8);
        assert_eq!(corr.backend.thread_num, Some(2));
        assert!(corr.backend.crosspatch);
    }

    #[test]
    fn estimator_names_are_parsed() {
        let config = StageConfig::from_yaml_str(StageKind::Summarize, "cross_est: DP\n").unwrap();
        assert_eq!(config.estimators().unwrap().cross_est, Some(Estimator::DavisPeebles));
        let config = StageConfig::from_yaml_str(StageKind::Summarize, "ref_est: XX\n").unwrap();
        assert_eq!(config.estimators().unwrap_err().info().code, "estimator");
    }
}
