//! SatHub API client.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};
use crate::types::{ArtifactKind, DataEnvelope, HealthResponse, PostRequest, PostResponse};

/// Per-request timeout. This is the only timeout protection a dispatch has.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the SatHub station API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// `base_url` is the service root (e.g. `https://api.sathub.de`); a
    /// trailing slash is ignored. With `insecure` set, TLS certificates are
    /// not verified.
    pub fn new(base_url: impl Into<String>, station_token: &str, insecure: bool) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Station {}", station_token))
            .map_err(|e| ApiError::Config(format!("Invalid station token: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        if insecure {
            warn!("TLS certificate verification is disabled");
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Created SatHub API client for {}", base_url);

        Ok(Self { base_url, client })
    }

    /// Service root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Create a post for a satellite pass.
    pub async fn create_post(&self, request: &PostRequest) -> Result<PostResponse> {
        let url = self.endpoint("posts");
        debug!(
            "Creating post for {} at {}",
            request.satellite_name, request.timestamp
        );

        let response = self.client.post(&url).json(request).send().await?;
        let envelope: DataEnvelope<PostResponse> =
            Self::decode(response, "create post").await?;

        Ok(envelope.data)
    }

    /// Upload one file to a post.
    ///
    /// The file is streamed from disk rather than read into memory.
    pub async fn upload_artifact(
        &self,
        post_id: &str,
        kind: ArtifactKind,
        path: &Path,
    ) -> Result<()> {
        let url = self.endpoint(&format!("posts/{}/{}", post_id, kind.endpoint()));

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| ApiError::File {
                path: path.to_path_buf(),
                source,
            })?;
        let length = file
            .metadata()
            .await
            .map_err(|source| ApiError::File {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| kind.field_name().to_string());

        let body = Body::wrap_stream(FramedRead::new(file, BytesCodec::new()));
        let part = Part::stream_with_length(body, length)
            .file_name(filename)
            .mime_str(kind.content_type(path))?;
        let form = Form::new().part(kind.field_name(), part);

        debug!("Uploading {} {} ({} bytes)", kind, path.display(), length);
        let response = self.client.post(&url).multipart(form).send().await?;
        Self::check_status(response, kind.operation()).await?;

        Ok(())
    }

    /// Upload a raster image.
    pub async fn upload_image(&self, post_id: &str, path: &Path) -> Result<()> {
        self.upload_artifact(post_id, ArtifactKind::Image, path).await
    }

    /// Upload a product descriptor.
    pub async fn upload_cbor(&self, post_id: &str, path: &Path) -> Result<()> {
        self.upload_artifact(post_id, ArtifactKind::Cbor, path).await
    }

    /// Upload a raw frame file.
    pub async fn upload_cadu(&self, post_id: &str, path: &Path) -> Result<()> {
        self.upload_artifact(post_id, ArtifactKind::Cadu, path).await
    }

    /// Report station liveness and fetch current settings.
    pub async fn station_health(&self) -> Result<HealthResponse> {
        let url = self.endpoint("stations/health");
        let response = self.client.post(&url).send().await?;
        let envelope: DataEnvelope<HealthResponse> = Self::decode(response, "health check").await?;
        Ok(envelope.data)
    }

    async fn check_status(response: Response, operation: &'static str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            operation,
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response, operation: &'static str) -> Result<T> {
        let response = Self::check_status(response, operation).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl ArtifactKind {
    fn operation(&self) -> &'static str {
        match self {
            Self::Image => "image upload",
            Self::Cbor => "CBOR upload",
            Self::Cadu => "CADU upload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(format!("{}/", server.uri()), "secret-token", false).unwrap()
    }

    #[tokio::test]
    async fn test_create_post_returns_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/posts"))
            .and(header("Authorization", "Station secret-token"))
            .and(body_partial_json(serde_json::json!({
                "satellite_name": "NOAA-19",
                "timestamp": "2024-01-01T00:00:00Z"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_string(
                r#"{"data": {"id": "post-1", "satellite_name": "NOAA-19", "images": []}}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let post = client
            .create_post(&PostRequest {
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                satellite_name: "NOAA-19".to_string(),
                metadata: r#"{"norad":33591}"#.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(post.id, "post-1");
        assert_eq!(post.satellite_name, "NOAA-19");
    }

    #[tokio::test]
    async fn test_create_post_surfaces_error_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(422).set_body_string("satellite_name required"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client
            .create_post(&PostRequest {
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                satellite_name: String::new(),
                metadata: String::new(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(422));
        let message = err.to_string();
        assert!(message.contains("create post"), "got: {}", message);
        assert!(message.contains("satellite_name required"), "got: {}", message);
    }

    #[tokio::test]
    async fn test_create_post_rejects_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .create_post(&PostRequest {
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                satellite_name: "METEOR-M2 3".to_string(),
                metadata: String::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_upload_cbor_streams_multipart() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();
        let cbor = temp_dir.path().join("product.cbor");
        std::fs::write(&cbor, [0xa0u8]).unwrap();

        Mock::given(method("POST"))
            .and(path("/api/posts/post-7/cbor"))
            .and(header("Authorization", "Station secret-token"))
            .and(body_string_contains("name=\"cbor\""))
            .and(body_string_contains("filename=\"product.cbor\""))
            .and(body_string_contains("application/cbor"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        client_for(&mock_server)
            .upload_cbor("post-7", &cbor)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_image_failure_status() {
        let mock_server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();
        let image = temp_dir.path().join("rgb.png");
        std::fs::write(&image, b"\x89PNG\r\n\x1a\n").unwrap();

        Mock::given(method("POST"))
            .and(path("/api/posts/post-7/images"))
            .respond_with(ResponseTemplate::new(413).set_body_string("too large"))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .upload_image("post-7", &image)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(413));
        assert!(err.to_string().contains("image upload"));
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let mock_server = MockServer::start().await;
        let err = client_for(&mock_server)
            .upload_cadu("post-7", Path::new("/nonexistent/pass.cadu"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::File { .. }));
    }

    #[tokio::test]
    async fn test_station_health_returns_settings() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/stations/health"))
            .and(header("Authorization", "Station secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data": {"status": "ok", "station_id": "st-9",
                    "timestamp": "2024-01-01T00:00:00Z",
                    "settings": {"health_check_interval": 60, "process_delay": 15}}}"#,
            ))
            .mount(&mock_server)
            .await;

        let health = client_for(&mock_server).station_health().await.unwrap();
        assert_eq!(health.station_id, "st-9");
        assert_eq!(health.settings.health_check_interval, Some(60));
        assert_eq!(health.settings.process_delay, Some(15));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("https://api.sathub.de/", "t", false).unwrap();
        assert_eq!(client.base_url(), "https://api.sathub.de");
        assert_eq!(client.endpoint("posts"), "https://api.sathub.de/api/posts");
    }

    #[test]
    fn test_rejects_token_with_newline() {
        let err = ApiClient::new("https://api.sathub.de", "bad\ntoken", false).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
