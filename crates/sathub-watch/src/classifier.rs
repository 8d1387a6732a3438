//! Completeness classification of candidate directories.

use crate::error::Result;
use crate::metadata::DATASET_FILE;
use crate::product::PRODUCT_FILE;
use globset::{Glob, GlobMatcher};
use std::path::Path;
use tracing::debug;

const RAW_FRAME_PATTERN: &str = "*.cadu";
const IMAGE_PATTERN: &str = "*.png";

/// Decides whether a directory holds a finished pass.
///
/// A pass is complete when it has `dataset.json` and either a `*.cadu` file
/// at its root or a subdirectory containing `product.cbor`.
#[derive(Debug, Clone)]
pub struct CompletenessClassifier {
    raw_frame: GlobMatcher,
    image: GlobMatcher,
}

impl CompletenessClassifier {
    /// Create a classifier with the standard file patterns.
    pub fn new() -> Result<Self> {
        Ok(Self {
            raw_frame: Glob::new(RAW_FRAME_PATTERN)?.compile_matcher(),
            image: Glob::new(IMAGE_PATTERN)?.compile_matcher(),
        })
    }

    /// Whether a file name is a raw frame file.
    pub fn is_raw_frame(&self, file_name: impl AsRef<Path>) -> bool {
        self.raw_frame.is_match(file_name)
    }

    /// Whether a file name is a raster image.
    pub fn is_image(&self, file_name: impl AsRef<Path>) -> bool {
        self.image.is_match(file_name)
    }

    /// Check whether `dir` is a complete pass.
    ///
    /// Unreadable directories are reported as incomplete.
    pub async fn is_complete(&self, dir: &Path) -> bool {
        if !is_file(&dir.join(DATASET_FILE)).await {
            debug!("No {} in {}", DATASET_FILE, dir.display());
            return false;
        }

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {}: {}", dir.display(), e);
                return false;
            }
        };

        let mut product_dirs = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_file() && self.is_raw_frame(entry.file_name()) {
                return true;
            }
            if file_type.is_dir() {
                product_dirs.push(entry.path());
            }
        }

        for product_dir in product_dirs {
            if is_file(&product_dir.join(PRODUCT_FILE)).await {
                return true;
            }
        }

        false
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
