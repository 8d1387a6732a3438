//! # SatHub Pass Ingestion
//!
//! Watches the directories a decoding pipeline writes into, decides when a
//! directory holds a finished satellite pass, and uploads it to SatHub.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  NotifyWatcher  │───▶│  PassDispatcher  │───▶│ UploadOrchestr. │
//! │  + sweeps       │    │ (delay, classify,│    │ (post, uploads, │
//! │                 │    │  dedupe, extract)│    │  health, move)  │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! A pass directory looks like:
//!
//! ```text
//! <pass-dir>/
//!   dataset.json
//!   *.cadu
//!   <product-dir>/product.cbor
//!   <product-dir>/*.png
//! ```
//!
//! Every pass is dispatched from a single task. A pass whose post cannot be
//! created is left in place and retried on the next sweep or event; once a
//! post exists the pass is moved into the archive root even if some
//! attachments failed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backends;
mod artifacts;
mod classifier;
pub mod config;
pub mod error;
mod events;
mod metadata;
mod orchestrator;
mod pass;
mod pipeline;
mod product;
mod scanner;
mod tracker;
pub mod traits;
mod uploader;

pub use artifacts::ArtifactSet;
pub use backends::NotifyWatcher;
pub use classifier::CompletenessClassifier;
pub use config::PassWatcherConfig;
pub use error::{Error, Result};
pub use events::{FileEvent, FileEventKind};
pub use metadata::{
    extract_metadata, read_dataset, Metadata, MetadataValue, PassRecord, DATASET_FILE,
    UNKNOWN_SATELLITE,
};
pub use orchestrator::{UploadOrchestrator, UploadReport};
pub use pass::PreparedPass;
pub use pipeline::{DispatchOutcome, PassDispatcher, PassWatcher};
pub use product::{earliest_timestamp, resolve_timestamp, PRODUCT_FILE};
pub use scanner::immediate_subdirectories;
pub use tracker::ProcessedState;
pub use traits::{FileWatcher, WatchHandle};
pub use uploader::PassUploader;

pub use sathub_api::ArtifactKind;
