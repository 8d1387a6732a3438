//! # SatHub Configuration Library
//!
//! Configuration for a SatHub ground station client: the YAML file the
//! operator edits, plus the small set of timing values the server is allowed
//! to change while the client runs.
//!
//! ## Features
//!
//! - YAML load/save with `~` expansion and restrictive file permissions
//! - Validation of the fields the client cannot run without
//! - [`RuntimeTiming`], an atomically swappable view of the process delay and
//!   health-check interval shared between the pipeline and the main loop
//! - [`ServerSettings`], the settings bag pushed by the server
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sathub_config::{ConfigLoader, RuntimeTiming};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("~/.config/sathub-client/config.yaml").await?;
//!     let timing = RuntimeTiming::from_config(&config.intervals);
//!     println!("process delay: {:?}", timing.process_delay());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod loader;
mod model;
mod timing;

pub use error::{ConfigError, Result};
pub use loader::{expand_path, ConfigLoader};
pub use model::*;
pub use timing::{RuntimeTiming, TimingChange};
