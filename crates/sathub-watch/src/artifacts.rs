//! Artifact discovery inside a pass directory.

use crate::classifier::CompletenessClassifier;
use crate::error::Result;
use crate::product::PRODUCT_FILE;
use crate::scanner::immediate_subdirectories;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Files of one pass that get attached to its post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    /// `*.cadu` files at the pass root
    pub raw_frames: Vec<PathBuf>,
    /// `product.cbor` of the first product directory, by name
    pub product_descriptor: Option<PathBuf>,
    /// `*.png` files of every product directory
    pub images: Vec<PathBuf>,
}

impl ArtifactSet {
    /// Discover the artifacts of the pass at `dir`.
    ///
    /// Only subdirectories holding a `product.cbor` are product directories;
    /// images elsewhere are ignored. Paths are sorted so uploads happen in a
    /// stable order.
    pub async fn discover(dir: &Path, classifier: &CompletenessClassifier) -> Result<Self> {
        let mut set = Self::default();

        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() && classifier.is_raw_frame(entry.file_name()) {
                set.raw_frames.push(entry.path());
            }
        }
        set.raw_frames.sort();

        for product_dir in immediate_subdirectories(dir).await? {
            let descriptor = product_dir.join(PRODUCT_FILE);
            if !tokio::fs::try_exists(&descriptor).await.unwrap_or(false) {
                continue;
            }

            if set.product_descriptor.is_none() {
                info!("Found product {}", product_dir.display());
                set.product_descriptor = Some(descriptor);
            }

            match Self::images_in(&product_dir, classifier).await {
                Ok(mut images) => set.images.append(&mut images),
                Err(e) => warn!(
                    "Failed to read product directory {}: {}",
                    product_dir.display(),
                    e
                ),
            }
        }

        debug!(
            "Artifacts in {}: {} cadu, cbor: {}, {} images",
            dir.display(),
            set.raw_frames.len(),
            set.product_descriptor.is_some(),
            set.images.len()
        );
        Ok(set)
    }

    async fn images_in(
        product_dir: &Path,
        classifier: &CompletenessClassifier,
    ) -> Result<Vec<PathBuf>> {
        let mut images = Vec::new();
        let mut entries = tokio::fs::read_dir(product_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if classifier.is_image(entry.file_name()) {
                images.push(entry.path());
            }
        }
        images.sort();
        Ok(images)
    }

    /// Total number of files.
    pub fn len(&self) -> usize {
        self.raw_frames.len() + usize::from(self.product_descriptor.is_some()) + self.images.len()
    }

    /// True when there is nothing to upload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
