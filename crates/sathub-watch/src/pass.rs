//! Loading a complete pass into a record plus its artifacts.

use crate::artifacts::ArtifactSet;
use crate::classifier::CompletenessClassifier;
use crate::error::Result;
use crate::metadata::{read_dataset, PassRecord};
use crate::product::resolve_timestamp;
use std::path::Path;
use tracing::{info, warn};

/// A pass ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPass {
    /// Normalized metadata
    pub record: PassRecord,
    /// Files to attach
    pub artifacts: ArtifactSet,
}

impl PreparedPass {
    /// Read `dataset.json`, discover artifacts, and prefer the product
    /// descriptor's capture time over the document's.
    pub async fn load(dir: &Path, classifier: &CompletenessClassifier) -> Result<Self> {
        let record = read_dataset(dir).await?;
        let artifacts = ArtifactSet::discover(dir, classifier).await?;

        let record = match &artifacts.product_descriptor {
            Some(descriptor) => match resolve_timestamp(descriptor).await {
                Ok(timestamp) => {
                    info!(
                        "Using CBOR timestamp {} instead of dataset timestamp {}",
                        timestamp,
                        record.timestamp()
                    );
                    record.with_timestamp(timestamp)
                }
                Err(e) => {
                    warn!(
                        "Failed to parse CBOR timestamps in {}, keeping dataset timestamp: {}",
                        descriptor.display(),
                        e
                    );
                    record
                }
            },
            None => record,
        };

        Ok(Self { record, artifacts })
    }
}
