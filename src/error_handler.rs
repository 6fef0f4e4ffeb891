//! Error taxonomy for configuration-time failures.
//!
//! Everything that can go wrong while loading parameter specs, editing the
//! configuration store or validating parameters is a [`FeatureGenError`].
//! Run-time failures (spawn errors, timeouts, non-zero exits) are not errors:
//! they come back as a [`RunOutcome`](crate::runner::RunOutcome) so that one
//! failing backend never aborts a batch.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used by the library modules.
pub type Result<T> = std::result::Result<T, FeatureGenError>;

#[derive(Debug, Error)]
pub enum FeatureGenError {
    /// Malformed parameter spec, store file or LLM definitions document.
    #[error("failed to parse {source_name}: {message}")]
    ConfigParse { source_name: String, message: String },

    /// A script or parameter spec file referenced by a configuration is missing.
    #[error("file does not exist: {}", path.display())]
    InvalidPath { path: PathBuf },

    #[error("a configuration named '{0}' already exists")]
    DuplicateName(String),

    #[error("no configuration named '{0}'")]
    NotFound(String),

    #[error("no LLM configurations are available")]
    NoConfigurations,

    #[error("invalid parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("parameter '{0}' is required and cannot be empty")]
    MissingRequired(String),

    #[error("parameter '{key}' value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FeatureGenError {
    pub fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::ConfigParse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_parameter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Short machine-friendly label, logged as `error_kind` when a command fails.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } => "config_parse",
            Self::InvalidPath { .. } => "invalid_path",
            Self::DuplicateName(_) => "duplicate_name",
            Self::NotFound(_) => "not_found",
            Self::NoConfigurations => "no_configurations",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::MissingRequired(_) => "missing_required",
            Self::OutOfRange { .. } => "out_of_range",
            Self::Io { .. } => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = FeatureGenError::parse("spec.json", "expected value at line 1 column 1");
        assert_eq!(
            err.to_string(),
            "failed to parse spec.json: expected value at line 1 column 1"
        );

        let err = FeatureGenError::OutOfRange {
            key: "Temperature".to_string(),
            value: 3.5,
            min: 0.0,
            max: 2.0,
        };
        assert!(err.to_string().contains("out of range [0, 2]"));
        assert_eq!(err.kind(), "out_of_range");
    }

    #[test]
    fn invalid_path_displays_path() {
        let err = FeatureGenError::InvalidPath {
            path: PathBuf::from("/missing/gen.py"),
        };
        assert_eq!(err.to_string(), "file does not exist: /missing/gen.py");
    }
}
