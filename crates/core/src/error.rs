//! Error types for acbuild
//!
//! Centralized configuration error handling using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for workspace and unit configuration
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {path:?}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unit '{unit}' has no usable version (found \"{found}\"); set `version` in unit.toml")]
    Unversioned { unit: String, found: String },

    #[error("Invalid dependency coordinate '{0}', expected group:name[:version]")]
    InvalidCoordinate(String),

    #[error("Unit name '{name}' is declared twice: {first:?} and {second:?}")]
    DuplicateUnit {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Invalid member pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Whether the error comes from user configuration rather than the environment
    pub fn is_configuration(&self) -> bool {
        !matches!(self, CoreError::Io(_))
    }
}
