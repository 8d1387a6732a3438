//! Error types for the pass ingestion pipeline.

use sathub_api::ApiError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while watching for and processing passes.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system watching error.
    #[error("File watching error: {0}")]
    Watch(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pattern matching error.
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// The pass metadata document could not be used.
    #[error("Invalid pass metadata: {0}")]
    Metadata(String),

    /// No capture time could be taken from a product descriptor.
    #[error("Product descriptor error: {0}")]
    Product(String),

    /// Remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The archive root could not be created.
    #[error("Failed to create archive directory {path}: {source}")]
    Archive {
        /// Archive root
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Watcher is already running.
    #[error("Pass watcher is already running")]
    AlreadyRunning,
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert notify errors to our error type.
impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err.to_string())
    }
}

/// Convert globset errors to our error type.
impl From<globset::Error> for Error {
    fn from(err: globset::Error) -> Self {
        Error::Pattern(err.to_string())
    }
}
