//! Error types for the API client.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`crate::ApiClient`].
#[derive(Error, Debug)]
pub enum ApiError {
    /// Client could not be constructed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request could not be sent or its body could not be read.
    #[error("Failed to send request: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("{operation} failed with status {status}: {body}")]
    Status {
        /// Operation that failed, e.g. "create post"
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body as returned by the server
        body: String,
    },

    /// Response body was not the expected JSON.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Upload source file could not be opened.
    #[error("Failed to open {path}: {source}")]
    File {
        /// File being uploaded
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// HTTP status code if the server answered with an error status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
