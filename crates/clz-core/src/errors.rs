//! Structured error types shared across clustz crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`ClzError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, column names, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Adds the `path` context entry.
    pub fn with_path(self, path: &Path) -> Self {
        self.with_context("path", path.display().to_string())
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the clustz pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum ClzError {
    /// Missing or contradictory configuration (no patch method, no randoms, ...).
    #[error("configuration error: {0}")]
    Config(ErrorInfo),
    /// A cache, catalog slot or file that was required does not exist.
    #[error("not found: {0}")]
    NotFound(ErrorInfo),
    /// Refused to overwrite an existing directory or file.
    #[error("already exists: {0}")]
    AlreadyExists(ErrorInfo),
    /// On-disk state that does not match what the cache expects.
    #[error("integrity error: {0}")]
    Integrity(ErrorInfo),
    /// Filesystem failures not covered by the families above.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Numerical failures (degenerate binning, empty samples, ...).
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl ClzError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            ClzError::Config(info)
            | ClzError::NotFound(info)
            | ClzError::AlreadyExists(info)
            | ClzError::Integrity(info)
            | ClzError::Io(info)
            | ClzError::Serde(info)
            | ClzError::Numeric(info) => info,
        }
    }

    /// Adds a context entry to the payload, keeping the family.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            ClzError::Config(info) => ClzError::Config(info.with_context(key, value)),
            ClzError::NotFound(info) => ClzError::NotFound(info.with_context(key, value)),
            ClzError::AlreadyExists(info) => ClzError::AlreadyExists(info.with_context(key, value)),
            ClzError::Integrity(info) => ClzError::Integrity(info.with_context(key, value)),
            ClzError::Io(info) => ClzError::Io(info.with_context(key, value)),
            ClzError::Serde(info) => ClzError::Serde(info.with_context(key, value)),
            ClzError::Numeric(info) => ClzError::Numeric(info.with_context(key, value)),
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(code: &str, message: impl Into<String>) -> Self {
        ClzError::Config(ErrorInfo::new(code, message))
    }

    /// Wraps an IO failure on `path` into the matching error family.
    ///
    /// `NotFound` and `AlreadyExists` IO kinds map onto the dedicated
    /// variants so callers can match on them without inspecting messages.
    pub fn from_io(code: &str, path: &Path, err: std::io::Error) -> Self {
        let info = ErrorInfo::new(code, err.to_string()).with_path(path);
        match err.kind() {
            std::io::ErrorKind::NotFound => ClzError::NotFound(info),
            std::io::ErrorKind::AlreadyExists => ClzError::AlreadyExists(info),
            _ => ClzError::Io(info),
        }
    }

    /// True for the [`ClzError::NotFound`] family.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClzError::NotFound(_))
    }
}
