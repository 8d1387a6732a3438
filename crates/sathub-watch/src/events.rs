//! File event types.

use std::path::PathBuf;

/// Represents a file system event under a watch root.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEvent {
    /// Kind of file event.
    pub kind: FileEventKind,

    /// Path to the file or directory.
    pub path: PathBuf,

    /// Whether the path was a directory when the event was received.
    pub is_dir: bool,
}

impl FileEvent {
    /// Create a new file event, probing the path for its type.
    pub fn new(kind: FileEventKind, path: PathBuf) -> Self {
        let is_dir = path.is_dir();
        Self {
            kind,
            path,
            is_dir,
        }
    }

    /// True for a directory that appeared under a watch root.
    pub fn is_new_directory(&self) -> bool {
        self.is_dir && self.kind == FileEventKind::Created
    }

    /// True when the path left its watch root.
    pub fn is_removal(&self) -> bool {
        self.kind == FileEventKind::Deleted
    }
}

/// Kinds of file events the pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// Path was created or moved in.
    Created,
    /// Path was deleted or moved out.
    Deleted,
}

impl FileEventKind {
    /// Get a string representation of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
        }
    }
}
