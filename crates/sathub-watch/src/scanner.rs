//! Sweeps of a watch root.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// List the immediate subdirectories of `root`, sorted by path.
///
/// Plain files and anything deeper than one level are ignored.
pub async fn immediate_subdirectories(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(root).await?;
    let mut dirs = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(e) => {
                debug!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if file_type.is_dir() {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_only_immediate_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("pass_b/IMG")).unwrap();
        std::fs::create_dir(root.join("pass_a")).unwrap();
        std::fs::write(root.join("notes.txt"), "not a pass").unwrap();

        let dirs = immediate_subdirectories(root).await.unwrap();
        assert_eq!(dirs, vec![root.join("pass_a"), root.join("pass_b")]);
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = immediate_subdirectories(&temp_dir.path().join("missing")).await;
        assert!(result.is_err());
    }
}
