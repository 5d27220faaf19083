#![deny(missing_docs)]
#![doc = "Validated stage configuration, stage runners and YAML pipelines for clustz."]

pub mod config;
pub mod handles;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod stages;

pub use config::{check_param_table, Slot, StageConfig, StageKind};
pub use handles::CacheHandle;
pub use logging::{init_logging, log_spec, StageLogLevel, LOG_LEVELS, LOG_TARGETS};
pub use params::{ParamDefault, ParamKind, ParamSpec};
pub use pipeline::{Pipeline, PipelineReport, PipelineStage, StageReport};
pub use stages::{AutoCorrelate, CacheCreate, CacheDrop, CrossCorrelate, Summarize, Summary};
