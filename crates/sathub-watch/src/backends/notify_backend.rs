//! Notify-based file watching backend.

use crate::{
    error::{Error, Result},
    events::{FileEvent, FileEventKind},
    traits::{FileWatcher, WatchHandle},
};

use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Notify-based watcher that forwards events to a tokio channel.
pub struct NotifyWatcher {
    /// Platform file system watcher
    watcher: RecommendedWatcher,
    /// Active watches
    watches: Vec<WatchHandle>,
}

impl NotifyWatcher {
    /// Create a watcher that sends every event to `event_sender`.
    ///
    /// Fails if the platform notification subsystem is unavailable.
    pub fn new(event_sender: mpsc::UnboundedSender<FileEvent>) -> Result<Self> {
        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    for file_event in Self::convert_notify_event(event) {
                        if let Err(e) = event_sender.send(file_event) {
                            debug!("Dropping file event, receiver closed: {}", e);
                        }
                    }
                }
                Err(e) => error!("Notify error: {}", e),
            }
        })
        .map_err(|e| Error::Watch(format!("Failed to create notify watcher: {}", e)))?;

        info!("Notify watcher initialized");
        Ok(Self {
            watcher,
            watches: Vec::new(),
        })
    }

    /// Convert a notify event to our file event format.
    ///
    /// A path renamed into a watched directory is reported as created.
    /// Content changes are dropped.
    fn convert_notify_event(event: notify::Event) -> Vec<FileEvent> {
        let notify::Event { kind, paths, .. } = event;

        match kind {
            EventKind::Create(_) => paths
                .into_iter()
                .map(|p| FileEvent::new(FileEventKind::Created, p))
                .collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => paths
                .into_iter()
                .nth(1)
                .map(|to| vec![FileEvent::new(FileEventKind::Created, to)])
                .unwrap_or_default(),
            EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => paths
                .into_iter()
                .map(|p| FileEvent::new(FileEventKind::Created, p))
                .collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => paths
                .into_iter()
                .map(|p| FileEvent::new(FileEventKind::Deleted, p))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl FileWatcher for NotifyWatcher {
    async fn watch(&mut self, path: PathBuf) -> Result<WatchHandle> {
        debug!("Adding watch for: {}", path.display());

        self.watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch(format!("Failed to watch {}: {}", path.display(), e)))?;

        let handle = WatchHandle::new(path);
        self.watches.push(handle.clone());
        info!("Watching directory: {}", handle.path.display());

        Ok(handle)
    }

    fn active_watches(&self) -> Vec<WatchHandle> {
        self.watches.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::time::Duration;
    use tempfile::TempDir;

    fn notify_event(kind: EventKind, paths: Vec<PathBuf>) -> notify::Event {
        notify::Event {
            kind,
            paths,
            attrs: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_notify_watcher_operations() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut watcher = NotifyWatcher::new(tx).unwrap();
        let temp_dir = TempDir::new().unwrap();
        let watch_path = temp_dir.path().to_path_buf();

        let other = TempDir::new().unwrap();

        let handle = watcher.watch(watch_path.clone()).await.unwrap();
        assert_eq!(handle.path, watch_path);
        let second = watcher.watch(other.path().to_path_buf()).await.unwrap();
        assert_ne!(handle.id, second.id);
        assert_eq!(watcher.active_watches(), vec![handle, second]);
    }

    #[tokio::test]
    async fn test_watch_missing_path_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut watcher = NotifyWatcher::new(tx).unwrap();

        let result = watcher.watch(PathBuf::from("/nonexistent/sathub/data")).await;
        assert!(matches!(result, Err(Error::Watch(_))));
        assert!(watcher.active_watches().is_empty());
    }

    #[tokio::test]
    async fn test_directory_creation_is_delivered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = NotifyWatcher::new(tx).unwrap();
        let temp_dir = TempDir::new().unwrap();
        watcher.watch(temp_dir.path().to_path_buf()).await.unwrap();

        let pass_dir = temp_dir.path().join("pass1");
        std::fs::create_dir(&pass_dir).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Some(event) if event.path == pass_dir => return event,
                    Some(_) => continue,
                    None => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("no event for created directory");

        assert!(event.is_new_directory());
    }

    #[test]
    fn test_event_conversion() {
        let events = NotifyWatcher::convert_notify_event(notify_event(
            EventKind::Create(CreateKind::Folder),
            vec![PathBuf::from("pass1")],
        ));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FileEventKind::Created);
        assert_eq!(events[0].path, PathBuf::from("pass1"));

        let events = NotifyWatcher::convert_notify_event(notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec![PathBuf::from("staging/pass2"), PathBuf::from("data/pass2")],
        ));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FileEventKind::Created);
        assert_eq!(events[0].path, PathBuf::from("data/pass2"));

        let events = NotifyWatcher::convert_notify_event(notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            vec![PathBuf::from("data/pass3")],
        ));
        assert_eq!(events[0].kind, FileEventKind::Created);

        let events = NotifyWatcher::convert_notify_event(notify_event(
            EventKind::Remove(RemoveKind::Folder),
            vec![PathBuf::from("data/pass1")],
        ));
        assert_eq!(events[0].kind, FileEventKind::Deleted);

        let events = NotifyWatcher::convert_notify_event(notify_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            vec![PathBuf::from("data/pass1/dataset.json")],
        ));
        assert!(events.is_empty());

        let events = NotifyWatcher::convert_notify_event(notify_event(
            EventKind::Access(notify::event::AccessKind::Any),
            vec![PathBuf::from("data/pass1")],
        ));
        assert!(events.is_empty());
    }
}
