//! # SatHub API Client
//!
//! Thin async client for the endpoints a ground station uses:
//!
//! - `POST /api/posts` to create a post for a satellite pass
//! - `POST /api/posts/{id}/images|cbor|cadu` to attach files to it
//! - `POST /api/stations/health` to report liveness and fetch settings
//!
//! Every request carries `Authorization: Station <token>`. File uploads are
//! streamed from disk as single-part multipart forms.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
mod error;
mod types;

pub use client::{ApiClient, REQUEST_TIMEOUT};
pub use error::{ApiError, Result};
pub use types::*;
