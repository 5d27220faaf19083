pub mod cache;
pub mod correlate;
pub mod params;
pub mod run;
pub mod summarize;

use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use clz_stage::{PipelineStage, StageKind, StageLogLevel};
use flexi_logger::LoggerHandle;
use serde_yaml::{Mapping, Value};

/// Stage configuration shared by the single-stage commands.
#[derive(Args, Debug, Clone, Default)]
pub struct StageOptions {
    /// YAML file with the stage configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Set one parameter, overriding the configuration file.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

impl StageOptions {
    /// Configuration file merged with the `--set` overrides; values are read
    /// as YAML scalars, so `n_patches=5` is an integer.
    pub fn to_value(&self, verbose: Option<&str>) -> Result<Value, Box<dyn Error>> {
        let mut mapping = match &self.config {
            Some(path) => match serde_yaml::from_str::<Value>(&fs::read_to_string(path)?)? {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => return Err(format!("{} must hold a mapping", path.display()).into()),
            },
            None => Mapping::new(),
        };
        for assignment in &self.set {
            let Some((key, value)) = assignment.split_once('=') else {
                return Err(format!("expected KEY=VALUE, got '{assignment}'").into());
            };
            mapping.insert(Value::from(key.trim()), serde_yaml::from_str(value)?);
        }
        if let Some(level) = verbose {
            if !mapping.contains_key("verbose") {
                mapping.insert(Value::from("verbose"), Value::from(level));
            }
        }
        Ok(Value::Mapping(mapping))
    }
}

/// Builds slot maps from `(tag, path)` pairs, skipping absent ones.
pub fn slots<'a, I>(pairs: I) -> BTreeMap<String, PathBuf>
where
    I: IntoIterator<Item = (&'a str, Option<&'a Path>)>,
{
    pairs
        .into_iter()
        .filter_map(|(tag, path)| path.map(|path| (tag.to_string(), path.to_path_buf())))
        .collect()
}

/// Validates and runs one stage, printing its report.
pub fn execute(
    kind: StageKind,
    options: &StageOptions,
    verbose: Option<&str>,
    inputs: BTreeMap<String, PathBuf>,
    outputs: BTreeMap<String, PathBuf>,
    logger: &mut LoggerHandle,
) -> Result<(), Box<dyn Error>> {
    let config = options.to_value(verbose)?;
    let stage = PipelineStage::new(kind.name(), kind, &config, inputs, outputs, Path::new("."))?;
    let _level = StageLogLevel::push(logger, stage.config().verbose())?;
    let report = stage.execute()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
