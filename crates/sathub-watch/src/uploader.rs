//! The remote side of the pipeline.

use crate::error::Result;
use crate::metadata::PassRecord;
use async_trait::async_trait;
use sathub_api::{ApiClient, ArtifactKind, PostRequest};
use sathub_config::ServerSettings;
use std::path::Path;

/// Remote operations the orchestrator needs.
#[async_trait]
pub trait PassUploader: Send + Sync {
    /// Create a post for `record`, returning its id.
    async fn create_post(&self, record: &PassRecord) -> Result<String>;

    /// Attach one file to a post.
    async fn upload_artifact(&self, post_id: &str, kind: ArtifactKind, path: &Path) -> Result<()>;

    /// Report liveness, returning the settings the server wants applied.
    async fn station_health(&self) -> Result<ServerSettings>;
}

#[async_trait]
impl PassUploader for ApiClient {
    async fn create_post(&self, record: &PassRecord) -> Result<String> {
        let request = PostRequest {
            timestamp: record.timestamp_rfc3339(),
            satellite_name: record.satellite_name().to_string(),
            metadata: record.metadata_json(),
        };
        let post = ApiClient::create_post(self, &request).await?;
        Ok(post.id)
    }

    async fn upload_artifact(&self, post_id: &str, kind: ArtifactKind, path: &Path) -> Result<()> {
        ApiClient::upload_artifact(self, post_id, kind, path).await?;
        Ok(())
    }

    async fn station_health(&self) -> Result<ServerSettings> {
        let health = ApiClient::station_health(self).await?;
        Ok(health.settings)
    }
}
