//! Logger setup restricted to the clustz crates.

use std::path::Path;

use clz_core::{ClzError, ErrorInfo};
use flexi_logger::{Duplicate, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle};

/// Log targets of the clustz crates.
pub const LOG_TARGETS: &[&str] = &["clz_core", "clz_catalog", "clz_corr", "clz_est", "clz_stage", "clustz"];

/// Accepted values of the `verbose` parameter.
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

fn logger_error(err: FlexiLoggerError) -> ClzError {
    ClzError::Config(ErrorInfo::new("logger", err.to_string()))
}

/// Builds a log filter that silences every target except the clustz
/// crates, which log at `level`.
pub fn log_spec(level: &str) -> Result<String, ClzError> {
    let level = level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ClzError::Config(
            ErrorInfo::new("verbose", format!("unknown log level '{level}'"))
                .with_hint(format!("use one of {}", LOG_LEVELS.join(", "))),
        ));
    }
    let mut spec = String::from("off");
    for target in LOG_TARGETS {
        spec.push_str(&format!(", {target}={level}"));
    }
    Ok(spec)
}

/// Starts the global logger writing to stderr, and additionally to a file in
/// `log_dir` when given.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggerHandle, ClzError> {
    let logger = Logger::try_with_str(&log_spec(level)?).map_err(logger_error)?;
    let logger = match log_dir {
        Some(dir) => logger
            .log_to_file(FileSpec::default().directory(dir).basename("clustz"))
            .duplicate_to_stderr(Duplicate::All),
        None => logger.log_to_stderr(),
    };
    logger.start().map_err(logger_error)
}

/// Switches the logger to a stage's level until dropped.
pub struct StageLogLevel<'a> {
    handle: &'a mut LoggerHandle,
}

impl<'a> StageLogLevel<'a> {
    /// Applies `level` to the clustz targets.
    pub fn push(handle: &'a mut LoggerHandle, level: &str) -> Result<Self, ClzError> {
        let spec = LogSpecification::parse(&log_spec(level)?).map_err(logger_error)?;
        handle.push_temp_spec(spec);
        Ok(Self { handle })
    }
}

impl Drop for StageLogLevel<'_> {
    fn drop(&mut self) {
        self.handle.pop_temp_spec();
    }
}
