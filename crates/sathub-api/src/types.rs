//! Request and response bodies.

use sathub_config::ServerSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Body of `POST /api/posts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRequest {
    /// Capture time, RFC 3339
    pub timestamp: String,
    /// Satellite name
    pub satellite_name: String,
    /// Remaining metadata, serialized as a JSON string
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metadata: String,
}

/// A created post.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PostResponse {
    /// Post identifier used by the upload endpoints
    pub id: String,
    /// Owning station id
    #[serde(default)]
    pub station_id: String,
    /// Owning station name
    #[serde(default)]
    pub station_name: String,
    /// Capture time as stored by the server
    #[serde(default)]
    pub timestamp: String,
    /// Satellite name as stored by the server
    #[serde(default)]
    pub satellite_name: String,
    /// Metadata JSON string as stored by the server
    #[serde(default)]
    pub metadata: String,
    /// Images already attached
    #[serde(default)]
    pub images: Vec<ImageResponse>,
    /// Creation time
    #[serde(default)]
    pub created_at: String,
    /// Last update time
    #[serde(default)]
    pub updated_at: String,
    /// Settings the server wants the station to use
    #[serde(default)]
    pub settings: ServerSettings,
}

/// An image attached to a post.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ImageResponse {
    /// Image id
    pub id: u64,
    /// Original filename
    #[serde(default)]
    pub filename: String,
    /// Public URL
    #[serde(default)]
    pub image_url: String,
}

/// Response of `POST /api/stations/health`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HealthResponse {
    /// Server-reported status
    #[serde(default)]
    pub status: String,
    /// Id of the station the token belongs to
    #[serde(default)]
    pub station_id: String,
    /// Server time
    #[serde(default)]
    pub timestamp: String,
    /// Settings the server wants the station to use
    #[serde(default)]
    pub settings: ServerSettings,
}

/// Responses are wrapped in `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// Kinds of files that can be attached to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Raster image from a product directory
    Image,
    /// SatDump product descriptor
    Cbor,
    /// Raw CADU frame file
    Cadu,
}

impl ArtifactKind {
    /// Path segment under `/api/posts/{id}/`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Cbor => "cbor",
            Self::Cadu => "cadu",
        }
    }

    /// Multipart form field name.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Cbor => "cbor",
            Self::Cadu => "cadu",
        }
    }

    /// Content type sent for a file of this kind.
    pub fn content_type(&self, path: &Path) -> &'static str {
        match self {
            Self::Cbor => "application/cbor",
            Self::Cadu => "application/octet-stream",
            Self::Image => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase());
                match ext.as_deref() {
                    Some("png") => "image/png",
                    Some("jpg") | Some("jpeg") => "image/jpeg",
                    Some("gif") => "image/gif",
                    Some("webp") => "image/webp",
                    _ => "application/octet-stream",
                }
            }
        }
    }

    /// Lowercase name used in log messages.
    pub fn as_str(&self) -> &'static str {
        self.field_name()
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_request_omits_empty_metadata() {
        let request = PostRequest {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            satellite_name: "NOAA-19".to_string(),
            metadata: String::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("metadata").is_none());
        assert_eq!(json["satellite_name"], "NOAA-19");
    }

    #[test]
    fn test_health_response_with_settings() {
        let body = r#"{"data": {"status": "ok", "station_id": "st-1",
            "settings": {"health_check_interval": 120, "process_delay": 30, "motd": "hi"}}}"#;
        let envelope: DataEnvelope<HealthResponse> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.data.station_id, "st-1");
        assert_eq!(envelope.data.settings.process_delay, Some(30));
        assert_eq!(envelope.data.settings.health_check_interval, Some(120));
    }

    #[test]
    fn test_artifact_content_types() {
        assert_eq!(ArtifactKind::Image.content_type(Path::new("a/rgb.PNG")), "image/png");
        assert_eq!(ArtifactKind::Image.content_type(Path::new("a/x.jpeg")), "image/jpeg");
        assert_eq!(
            ArtifactKind::Image.content_type(Path::new("a/x")),
            "application/octet-stream"
        );
        assert_eq!(
            ArtifactKind::Cbor.content_type(Path::new("product.cbor")),
            "application/cbor"
        );
        assert_eq!(ArtifactKind::Cadu.endpoint(), "cadu");
        assert_eq!(ArtifactKind::Image.endpoint(), "images");
    }
}
