//! YAML pipelines: stages listed in execution order with their files.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use clz_catalog::DataSource;
use clz_core::{digest_file, write_json, ClzError, ErrorInfo};
use clz_corr::CorrFunc;
use flexi_logger::LoggerHandle;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::config::{check_param_table, StageConfig, StageKind};
use crate::handles::CacheHandle;
use crate::logging::{log_spec, StageLogLevel};
use crate::stages::{AutoCorrelate, CacheCreate, CacheDrop, CrossCorrelate, Summarize};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineFile {
    stages: Vec<StageEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StageEntry {
    name: String,
    stage: StageKind,
    #[serde(default)]
    config: Value,
    #[serde(default)]
    inputs: BTreeMap<String, PathBuf>,
    #[serde(default)]
    outputs: BTreeMap<String, PathBuf>,
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    let path = clz_catalog::normalise_path(path);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

#[derive(Debug, Clone)]
enum Runner {
    CacheCreate(CacheCreate),
    CacheDrop(CacheDrop),
    AutoCorrelate(AutoCorrelate),
    CrossCorrelate(CrossCorrelate),
    Summarize(Summarize),
}

/// One validated stage with resolved input and output files.
#[derive(Debug, Clone)]
pub struct PipelineStage {
    name: String,
    config: StageConfig,
    inputs: BTreeMap<String, PathBuf>,
    outputs: BTreeMap<String, PathBuf>,
    runner: Runner,
}

impl PipelineStage {
    /// Validates the configuration and the slots of a stage.
    ///
    /// Relative paths, including the cache path of `cache_create`, are
    /// resolved against `base_dir`.
    pub fn new(
        name: impl Into<String>,
        kind: StageKind,
        config: &Value,
        inputs: BTreeMap<String, PathBuf>,
        outputs: BTreeMap<String, PathBuf>,
        base_dir: &Path,
    ) -> Result<Self, ClzError> {
        let name = name.into();
        let stage = Self::build(&name, kind, config, inputs, outputs, base_dir);
        stage.map_err(|err| err.with_context("stage_name", name.as_str()))
    }

    fn build(
        name: &str,
        kind: StageKind,
        config: &Value,
        inputs: BTreeMap<String, PathBuf>,
        outputs: BTreeMap<String, PathBuf>,
        base_dir: &Path,
    ) -> Result<Self, ClzError> {
        let config = StageConfig::from_yaml_value(kind, config)?;
        log_spec(config.verbose())?;

        for tag in inputs.keys() {
            if !kind.inputs().iter().any(|slot| slot.tag == tag) {
                return Err(ClzError::Config(
                    ErrorInfo::new("unknown-input", format!("unknown input '{tag}'"))
                        .with_context("stage", kind.name()),
                ));
            }
        }
        for slot in kind.inputs().iter().filter(|slot| slot.required) {
            if !inputs.contains_key(slot.tag) {
                return Err(ClzError::Config(
                    ErrorInfo::new("missing-input", format!("missing input '{}'", slot.tag))
                        .with_context("stage", kind.name()),
                ));
            }
        }
        for tag in outputs.keys() {
            if !kind.outputs().contains(&tag.as_str()) {
                return Err(ClzError::Config(
                    ErrorInfo::new("unknown-output", format!("unknown output '{tag}'"))
                        .with_context("stage", kind.name()),
                ));
            }
        }
        for tag in kind.outputs() {
            if !outputs.contains_key(*tag) {
                return Err(ClzError::Config(
                    ErrorInfo::new("missing-output", format!("missing output '{tag}'"))
                        .with_context("stage", kind.name()),
                ));
            }
        }

        let runner = match kind {
            StageKind::CacheCreate => Runner::CacheCreate(CacheCreate::new(&config, base_dir)?),
            StageKind::CacheDrop => Runner::CacheDrop(CacheDrop::new(&config)?),
            StageKind::AutoCorrelate => Runner::AutoCorrelate(AutoCorrelate::new(&config)?),
            StageKind::CrossCorrelate => Runner::CrossCorrelate(CrossCorrelate::new(&config)?),
            StageKind::Summarize => Runner::Summarize(Summarize::new(&config)?),
        };
        let resolve_all = |slots: BTreeMap<String, PathBuf>| -> BTreeMap<String, PathBuf> {
            slots
                .into_iter()
                .map(|(tag, path)| (tag, resolve(base_dir, &path)))
                .collect()
        };
        Ok(Self {
            name: name.to_string(),
            config,
            inputs: resolve_all(inputs),
            outputs: resolve_all(outputs),
            runner,
        })
    }

    /// Stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage kind.
    pub fn kind(&self) -> StageKind {
        self.config.kind()
    }

    /// Validated configuration.
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Resolved input file of `tag`.
    pub fn input(&self, tag: &str) -> Option<&Path> {
        self.inputs.get(tag).map(PathBuf::as_path)
    }

    /// Resolved output file of `tag`.
    pub fn output(&self, tag: &str) -> Option<&Path> {
        self.outputs.get(tag).map(PathBuf::as_path)
    }

    fn required_input(&self, tag: &str) -> Result<&Path, ClzError> {
        self.input(tag).ok_or_else(|| {
            ClzError::config("missing-input", format!("missing input '{tag}'"))
        })
    }

    fn required_output(&self, tag: &str) -> Result<&Path, ClzError> {
        self.output(tag).ok_or_else(|| {
            ClzError::config("missing-output", format!("missing output '{tag}'"))
        })
    }

    fn optional_corrfunc(&self, tag: &str) -> Result<Option<CorrFunc>, ClzError> {
        self.input(tag).map(CorrFunc::from_file).transpose()
    }

    /// Runs the stage and records digests of its outputs.
    pub fn execute(&self) -> Result<StageReport, ClzError> {
        let started_at = Utc::now().to_rfc3339();
        let clock = Instant::now();
        log::info!("running stage '{}' ({})", self.name, self.kind().name());

        match &self.runner {
            Runner::CacheCreate(stage) => {
                let data = self.required_input("data")?;
                let rand = self.input("rand");
                let patch_source = self
                    .input("patch_source")
                    .map(|file| CacheHandle::read(file)?.open())
                    .transpose()?;
                let cache = stage.run(
                    DataSource::Path(data),
                    rand.map(DataSource::Path),
                    patch_source.as_ref(),
                )?;
                CacheHandle::new(cache.path()).write(self.required_output("cache")?)?;
            }
            Runner::CacheDrop(stage) => {
                let handle = CacheHandle::read(self.required_input("cache")?)?;
                stage.run(&handle.path)?;
            }
            Runner::AutoCorrelate(stage) => {
                let sample = CacheHandle::read(self.required_input("sample")?)?.open()?;
                let corr = stage.run(&sample)?;
                corr.to_file(self.required_output("auto_corr")?)?;
            }
            Runner::CrossCorrelate(stage) => {
                let reference = CacheHandle::read(self.required_input("reference")?)?.open()?;
                let unknown = CacheHandle::read(self.required_input("unknown")?)?.open()?;
                let corr = stage.run(&reference, &unknown)?;
                corr.to_file(self.required_output("cross_corr")?)?;
            }
            Runner::Summarize(stage) => {
                let cross = CorrFunc::from_file(self.required_input("cross_corr")?)?;
                let ref_corr = self.optional_corrfunc("auto_corr_ref")?;
                let unk_corr = self.optional_corrfunc("auto_corr_unk")?;
                let summary = stage.run(&cross, ref_corr.as_ref(), unk_corr.as_ref())?;
                summary.density.write_csv(self.required_output("output")?)?;
                summary.data.to_file(self.required_output("estimate")?)?;
            }
        }

        let mut outputs = BTreeMap::new();
        for (tag, path) in &self.outputs {
            outputs.insert(tag.clone(), digest_file(path)?);
        }
        let elapsed_ms = clock.elapsed().as_millis() as u64;
        log::info!("stage '{}' finished in {elapsed_ms} ms", self.name);
        Ok(StageReport {
            name: self.name.clone(),
            stage: self.kind(),
            started_at,
            elapsed_ms,
            outputs,
        })
    }
}

/// Stages validated together and run in order.
#[derive(Debug, Clone)]
pub struct Pipeline {
    base_dir: PathBuf,
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    /// Parses and validates a pipeline; relative paths resolve against `base_dir`.
    pub fn from_yaml_str(text: &str, base_dir: &Path) -> Result<Self, ClzError> {
        check_param_table()?;
        let file: PipelineFile = serde_yaml::from_str(text)
            .map_err(|err| ClzError::Serde(ErrorInfo::new("pipeline-yaml", err.to_string())))?;
        if file.stages.is_empty() {
            return Err(ClzError::config("pipeline-empty", "pipeline lists no stages"));
        }
        let mut names = BTreeSet::new();
        let mut stages = Vec::with_capacity(file.stages.len());
        for entry in file.stages {
            if !names.insert(entry.name.clone()) {
                return Err(ClzError::Config(
                    ErrorInfo::new("duplicate-stage", format!("stage name '{}' is used twice", entry.name)),
                ));
            }
            stages.push(PipelineStage::new(
                entry.name,
                entry.stage,
                &entry.config,
                entry.inputs,
                entry.outputs,
                base_dir,
            )?);
        }
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            stages,
        })
    }

    /// Loads a pipeline file; relative paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ClzError> {
        let text = fs::read_to_string(path).map_err(|err| ClzError::from_io("pipeline-read", path, err))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        Self::from_yaml_str(&text, &base_dir).map_err(|err| err.with_context("pipeline", path.display().to_string()))
    }

    /// Directory relative paths were resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    /// Runs every stage in order, stopping at the first failure.
    ///
    /// With a logger handle each stage logs at its own `verbose` level.
    pub fn run(&self, mut logger: Option<&mut LoggerHandle>) -> Result<PipelineReport, ClzError> {
        let started_at = Utc::now().to_rfc3339();
        let mut reports = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let _level = match logger.as_deref_mut() {
                Some(handle) => Some(StageLogLevel::push(handle, stage.config().verbose())?),
                None => None,
            };
            let report = stage
                .execute()
                .map_err(|err| err.with_context("stage_name", stage.name()))?;
            reports.push(report);
        }
        Ok(PipelineReport {
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            stages: reports,
        })
    }
}

/// Record of one executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage name.
    pub name: String,
    /// Stage kind.
    pub stage: StageKind,
    /// RFC 3339 start time.
    pub started_at: String,
    /// Wall time in milliseconds.
    pub elapsed_ms: u64,
    /// SHA-256 digest per output tag.
    pub outputs: BTreeMap<String, String>,
}

/// Record of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// RFC 3339 start time.
    pub started_at: String,
    /// RFC 3339 end time.
    pub finished_at: String,
    /// Executed stages in order.
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// Writes the report as JSON.
    pub fn write(&self, path: &Path) -> Result<(), ClzError> {
        write_json(path, self)
    }
}
