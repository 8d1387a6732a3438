//! In-memory processed-state tracking.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Set of pass directories that are being handled or already were.
///
/// Nothing here is persisted; after a restart the archive move is the only
/// record that a pass was uploaded.
#[derive(Debug, Default)]
pub struct ProcessedState {
    marked: Mutex<HashSet<PathBuf>>,
}

impl ProcessedState {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as owned by the pipeline.
    ///
    /// Returns false if it was already marked, in which case the caller must
    /// not process it.
    pub fn mark_in_progress(&self, path: &Path) -> bool {
        self.marked.lock().insert(path.to_path_buf())
    }

    /// Whether `path` is in flight or done.
    pub fn is_marked(&self, path: &Path) -> bool {
        self.marked.lock().contains(path)
    }

    /// Make `path` eligible again after a failed post.
    pub fn clear(&self, path: &Path) {
        self.marked.lock().remove(path);
    }

    /// Number of marked paths.
    pub fn len(&self) -> usize {
        self.marked.lock().len()
    }

    /// True when nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
