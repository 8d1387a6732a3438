//! Upload sequencing for one pass.

use crate::error::Result;
use crate::pass::PreparedPass;
use crate::uploader::PassUploader;
use sathub_api::ArtifactKind;
use sathub_config::RuntimeTiming;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a pass whose post was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Id of the created post
    pub post_id: String,
    /// Files that were attached
    pub uploaded: Vec<PathBuf>,
    /// Files whose upload failed
    pub failed: Vec<PathBuf>,
    /// Where the pass directory ended up, if the move succeeded
    pub archived_to: Option<PathBuf>,
}

/// Creates the post for a pass, attaches its files, and archives it.
pub struct UploadOrchestrator {
    uploader: Arc<dyn PassUploader>,
    archive_root: PathBuf,
    timing: Arc<RuntimeTiming>,
}

impl UploadOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        uploader: Arc<dyn PassUploader>,
        archive_root: impl Into<PathBuf>,
        timing: Arc<RuntimeTiming>,
    ) -> Self {
        Self {
            uploader,
            archive_root: archive_root.into(),
            timing,
        }
    }

    /// Run the upload sequence for the pass in `dir`.
    ///
    /// Only a failure to create the post is returned as an error; everything
    /// after it is best-effort and reported in the [`UploadReport`].
    pub async fn submit(&self, dir: &Path, pass: &PreparedPass) -> Result<UploadReport> {
        let post_id = self.uploader.create_post(&pass.record).await?;
        info!(
            "Created post {} for {} ({})",
            post_id,
            pass.record.satellite_name(),
            dir.display()
        );

        let mut report = UploadReport {
            post_id,
            ..Default::default()
        };

        let artifacts = &pass.artifacts;
        let uploads = artifacts
            .raw_frames
            .iter()
            .map(|p| (ArtifactKind::Cadu, p))
            .chain(
                artifacts
                    .product_descriptor
                    .iter()
                    .map(|p| (ArtifactKind::Cbor, p)),
            )
            .chain(artifacts.images.iter().map(|p| (ArtifactKind::Image, p)));

        for (kind, path) in uploads {
            match self
                .uploader
                .upload_artifact(&report.post_id, kind, path)
                .await
            {
                Ok(()) => {
                    info!("Uploaded {} {} to post {}", kind, file_name(path), report.post_id);
                    report.uploaded.push(path.clone());
                }
                Err(e) => {
                    warn!("Failed to upload {} {}: {}", kind, path.display(), e);
                    report.failed.push(path.clone());
                }
            }
        }

        match self.uploader.station_health().await {
            Ok(settings) => {
                self.timing.apply(&settings);
            }
            Err(e) => warn!("Failed to send health check: {}", e),
        }

        report.archived_to = self.archive(dir).await;
        Ok(report)
    }

    async fn archive(&self, dir: &Path) -> Option<PathBuf> {
        let Some(name) = dir.file_name() else {
            warn!("Cannot archive {}: no directory name", dir.display());
            return None;
        };
        let dest = self.archive_root.join(name);

        match tokio::fs::rename(dir, &dest).await {
            Ok(()) => {
                info!("Moved {} to {}", dir.display(), dest.display());
                Some(dest)
            }
            Err(e) => {
                warn!(
                    "Failed to move {} to {}: {}",
                    dir.display(),
                    dest.display(),
                    e
                );
                None
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
