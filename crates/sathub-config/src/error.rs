//! Error types for configuration handling.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, validating or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Config file (or its directory) could not be written.
    #[error("Failed to write config file {path}: {source}")]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// YAML could not be parsed.
    #[error("Failed to parse config file: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// Configuration could not be serialized.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// A required field is missing or out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
