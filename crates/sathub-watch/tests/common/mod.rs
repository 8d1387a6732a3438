//! Shared fixtures for pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sathub_config::{RuntimeTiming, ServerSettings};
use sathub_watch::{ArtifactKind, Error, PassRecord, PassUploader, PassWatcherConfig, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// In-memory uploader that records every call.
#[derive(Default)]
pub struct RecordingUploader {
    pub posts: Mutex<Vec<PassRecord>>,
    pub uploads: Mutex<Vec<(ArtifactKind, PathBuf)>>,
    pub health_calls: AtomicUsize,
    /// Number of upcoming post attempts that fail
    pub failing_posts: AtomicUsize,
    /// File names whose upload fails
    pub failing_files: Mutex<HashSet<String>>,
    /// Settings returned by the health call
    pub settings: Mutex<ServerSettings>,
    pub post_latency: Mutex<Duration>,
}

impl RecordingUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_posts(&self, count: usize) {
        self.failing_posts.store(count, Ordering::SeqCst);
    }

    pub fn fail_upload_of(&self, file_name: &str) {
        self.failing_files.lock().insert(file_name.to_string());
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().len()
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads
            .lock()
            .iter()
            .map(|(_, p)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

#[async_trait]
impl PassUploader for RecordingUploader {
    async fn create_post(&self, record: &PassRecord) -> Result<String> {
        let latency = *self.post_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let failing = self.failing_posts.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_posts.store(failing - 1, Ordering::SeqCst);
            return Err(Error::Config("post rejected".to_string()));
        }

        let mut posts = self.posts.lock();
        posts.push(record.clone());
        Ok(format!("post-{}", posts.len()))
    }

    async fn upload_artifact(&self, _post_id: &str, kind: ArtifactKind, path: &Path) -> Result<()> {
        self.uploads.lock().push((kind, path.to_path_buf()));

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if self.failing_files.lock().contains(&name) {
            return Err(Error::Config(format!("upload of {} rejected", name)));
        }
        Ok(())
    }

    async fn station_health(&self) -> Result<ServerSettings> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.settings.lock().clone())
    }
}

/// A watch root and archive root inside one temp dir.
pub struct Fixture {
    pub temp_dir: TempDir,
    pub watch_root: PathBuf,
    pub archive_root: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let watch_root = temp_dir.path().join("data");
        let archive_root = temp_dir.path().join("processed");
        std::fs::create_dir_all(&watch_root).unwrap();
        std::fs::create_dir_all(&archive_root).unwrap();
        Self {
            temp_dir,
            watch_root,
            archive_root,
        }
    }

    /// Watcher config with no process delay.
    pub fn config(&self) -> PassWatcherConfig {
        PassWatcherConfig::new(vec![self.watch_root.clone()], self.archive_root.clone())
            .with_timing(Arc::new(RuntimeTiming::new(
                Duration::ZERO,
                Duration::from_secs(300),
            )))
    }

    /// Write `pass_name` with a dataset and one product directory holding a
    /// descriptor and the given images.
    pub fn write_product_pass(&self, pass_name: &str, dataset: &str, images: &[&str]) -> PathBuf {
        write_product_pass(&self.watch_root, pass_name, dataset, images)
    }
}

pub fn write_product_pass(root: &Path, pass_name: &str, dataset: &str, images: &[&str]) -> PathBuf {
    let dir = root.join(pass_name);
    std::fs::create_dir_all(dir.join("IMG")).unwrap();
    std::fs::write(dir.join("dataset.json"), dataset).unwrap();
    std::fs::write(dir.join("IMG/product.cbor"), product_cbor(&[-1, 100])).unwrap();
    for image in images {
        std::fs::write(dir.join("IMG").join(image), b"\x89PNG\r\n\x1a\n").unwrap();
    }
    dir
}

pub fn product_cbor(timestamps: &[i64]) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::into_writer(&serde_json::json!({ "timestamps": timestamps }), &mut buf).unwrap();
    buf
}

pub const NOAA_19_DATASET: &str =
    r#"{"satellite_name":"NOAA-19","timestamp":"2024-01-01T00:00:00Z"}"#;
