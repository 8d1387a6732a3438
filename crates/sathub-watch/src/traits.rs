//! Core traits for the file watching backends.

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Core trait for file watching backends.
///
/// Watches are never recursive; only the immediate children of a watched
/// path produce events.
#[async_trait]
pub trait FileWatcher: Send + Sync {
    /// Start watching the specified path.
    async fn watch(&mut self, path: PathBuf) -> Result<WatchHandle>;

    /// Get all active watches.
    fn active_watches(&self) -> Vec<WatchHandle>;
}

static NEXT_WATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to an active watch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchHandle {
    /// Unique identifier for this watch.
    pub id: u64,

    /// Path being watched.
    pub path: PathBuf,
}

impl WatchHandle {
    /// Create a new watch handle.
    pub fn new(path: PathBuf) -> Self {
        Self {
            id: NEXT_WATCH_ID.fetch_add(1, Ordering::Relaxed),
            path,
        }
    }
}
