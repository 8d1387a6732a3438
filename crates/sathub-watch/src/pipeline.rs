//! Dispatch of candidate directories and the watcher task driving it.

use crate::{
    backends::NotifyWatcher,
    classifier::CompletenessClassifier,
    config::PassWatcherConfig,
    error::{Error, Result},
    events::FileEvent,
    orchestrator::{UploadOrchestrator, UploadReport},
    pass::PreparedPass,
    scanner::immediate_subdirectories,
    tracker::ProcessedState,
    traits::FileWatcher,
    uploader::PassUploader,
};
use parking_lot::Mutex;
use sathub_config::RuntimeTiming;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};
use tracing::{debug, error, info, warn};

/// What happened to a dispatched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Already in flight or uploaded by this process.
    AlreadyHandled,
    /// Not a finished pass yet.
    Incomplete,
    /// Metadata could not be read or the post could not be created. The
    /// directory is left in place and will be tried again.
    Retry,
    /// The post was created.
    Posted(UploadReport),
}

/// Takes a candidate directory from detection to archive.
pub struct PassDispatcher {
    watch_roots: Vec<PathBuf>,
    classifier: CompletenessClassifier,
    tracker: Arc<ProcessedState>,
    orchestrator: UploadOrchestrator,
    timing: Arc<RuntimeTiming>,
    /// Paths whose process delay has already been waited out
    first_seen: Mutex<HashSet<PathBuf>>,
}

impl PassDispatcher {
    /// Create a dispatcher.
    pub fn new(config: &PassWatcherConfig, uploader: Arc<dyn PassUploader>) -> Result<Self> {
        Ok(Self {
            watch_roots: config.watch_roots.clone(),
            classifier: CompletenessClassifier::new()?,
            tracker: Arc::new(ProcessedState::new()),
            orchestrator: UploadOrchestrator::new(
                uploader,
                config.archive_root.clone(),
                Arc::clone(&config.timing),
            ),
            timing: Arc::clone(&config.timing),
            first_seen: Mutex::new(HashSet::new()),
        })
    }

    /// Processed-state set used by this dispatcher.
    pub fn tracker(&self) -> &Arc<ProcessedState> {
        &self.tracker
    }

    /// Process one candidate directory.
    ///
    /// The process delay is waited out the first time a path is seen. Safe to
    /// call concurrently for the same path: at most one call creates a post.
    pub async fn dispatch(&self, dir: &Path) -> DispatchOutcome {
        if self.tracker.is_marked(dir) {
            return DispatchOutcome::AlreadyHandled;
        }

        let first_detection = self.first_seen.lock().insert(dir.to_path_buf());
        if first_detection {
            let delay = self.timing.process_delay();
            if !delay.is_zero() {
                info!(
                    delay_secs = delay.as_secs(),
                    "Waiting before processing {}",
                    dir.display()
                );
                tokio::time::sleep(delay).await;
            }
        }

        if !self.classifier.is_complete(dir).await {
            debug!("Not a complete pass yet, skipping {}", dir.display());
            return DispatchOutcome::Incomplete;
        }

        if !self.tracker.mark_in_progress(dir) {
            return DispatchOutcome::AlreadyHandled;
        }

        info!("Processing satellite pass {}", dir.display());
        let pass = match PreparedPass::load(dir, &self.classifier).await {
            Ok(pass) => pass,
            Err(e) => {
                error!("Failed to read pass {}: {}", dir.display(), e);
                self.tracker.clear(dir);
                return DispatchOutcome::Retry;
            }
        };

        match self.orchestrator.submit(dir, &pass).await {
            Ok(report) => {
                self.first_seen.lock().remove(dir);
                DispatchOutcome::Posted(report)
            }
            Err(e) => {
                error!("Failed to create post for {}: {}", dir.display(), e);
                self.tracker.clear(dir);
                DispatchOutcome::Retry
            }
        }
    }

    /// Forget that `dir` was seen, so a directory recreated under the same
    /// name waits out the process delay again.
    pub fn forget(&self, dir: &Path) {
        if self.first_seen.lock().remove(dir) {
            debug!("Forgot removed directory {}", dir.display());
        }
    }

    async fn prune_first_seen(&self) {
        let seen: Vec<PathBuf> = self.first_seen.lock().iter().cloned().collect();
        for dir in seen {
            if !tokio::fs::try_exists(&dir).await.unwrap_or(true) {
                self.forget(&dir);
            }
        }
    }

    /// Dispatch every complete, unhandled directory under the watch roots.
    ///
    /// Returns the number of passes posted. Unreadable roots are skipped.
    pub async fn sweep(&self) -> usize {
        self.prune_first_seen().await;
        let mut posted = 0;

        for root in &self.watch_roots {
            let dirs = match immediate_subdirectories(root).await {
                Ok(dirs) => dirs,
                Err(e) => {
                    warn!("Failed to read directory {}: {}", root.display(), e);
                    continue;
                }
            };

            for dir in dirs {
                if self.tracker.is_marked(&dir) || !self.classifier.is_complete(&dir).await {
                    continue;
                }
                if let DispatchOutcome::Posted(_) = self.dispatch(&dir).await {
                    posted += 1;
                }
            }
        }

        debug!("Sweep finished, {} passes posted", posted);
        posted
    }
}

/// Watches the configured roots and feeds new directories to a
/// [`PassDispatcher`].
pub struct PassWatcher {
    config: PassWatcherConfig,
    dispatcher: Arc<PassDispatcher>,
    watcher: Option<Box<dyn FileWatcher>>,
    processor_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl PassWatcher {
    /// Create a stopped watcher.
    pub fn new(config: PassWatcherConfig, uploader: Arc<dyn PassUploader>) -> Result<Self> {
        let dispatcher = Arc::new(PassDispatcher::new(&config, uploader)?);
        Ok(Self {
            config,
            dispatcher,
            watcher: None,
            processor_task: None,
            shutdown_tx: None,
        })
    }

    /// The dispatcher the watcher task feeds.
    pub fn dispatcher(&self) -> Arc<PassDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Whether the watcher task is running.
    pub fn is_running(&self) -> bool {
        self.processor_task.is_some()
    }

    /// Create the archive root, subscribe to the watch roots, and start the
    /// dispatch task.
    ///
    /// Fails if the archive root cannot be created or the notification
    /// subsystem is unavailable. Roots that cannot be watched are skipped.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }

        info!("Starting pass watcher");

        let archive_root = &self.config.archive_root;
        tokio::fs::create_dir_all(archive_root)
            .await
            .map_err(|source| Error::Archive {
                path: archive_root.clone(),
                source,
            })?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = NotifyWatcher::new(event_tx)?;
        for root in &self.config.watch_roots {
            if let Err(e) = watcher.watch(root.clone()).await {
                warn!("Failed to watch {}: {}", root.display(), e);
            }
        }
        if watcher.active_watches().is_empty() {
            warn!("No watch roots could be subscribed; relying on sweeps only");
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(Self::run(
            Arc::clone(&self.dispatcher),
            event_rx,
            shutdown_rx,
            self.config.rescan_interval,
        ));

        self.watcher = Some(Box::new(watcher));
        self.shutdown_tx = Some(shutdown_tx);
        self.processor_task = Some(task);

        info!(
            "Pass watcher started on {} roots, archiving to {}",
            self.config.watch_roots.len(),
            self.config.archive_root.display()
        );
        Ok(())
    }

    /// Close the subscription and wait for the dispatch task to finish its
    /// current pass.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        info!("Stopping pass watcher");

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }
        self.watcher = None;

        if let Some(task) = self.processor_task.take() {
            if let Err(e) = task.await {
                warn!("Pass watcher task ended abnormally: {}", e);
            }
        }

        info!("Pass watcher stopped");
        Ok(())
    }

    async fn run(
        dispatcher: Arc<PassDispatcher>,
        mut events: mpsc::UnboundedReceiver<FileEvent>,
        mut shutdown: mpsc::Receiver<()>,
        rescan_interval: Option<Duration>,
    ) {
        dispatcher.sweep().await;

        let mut rescan =
            rescan_interval.map(|period| tokio::time::interval_at(Instant::now() + period, period));

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    info!("Pass watcher shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) if event.is_new_directory() => {
                        info!("Detected new directory {}", event.path.display());
                        dispatcher.dispatch(&event.path).await;
                    }
                    Some(event) if event.is_removal() => {
                        dispatcher.forget(&event.path);
                    }
                    Some(event) => {
                        debug!(
                            "Ignoring {} event for {}",
                            event.kind.as_str(),
                            event.path.display()
                        );
                    }
                    None => {
                        debug!("File event stream closed");
                        break;
                    }
                },
                _ = next_rescan(&mut rescan) => {
                    debug!("Periodic sweep");
                    dispatcher.sweep().await;
                }
            }
        }
    }
}

async fn next_rescan(rescan: &mut Option<Interval>) {
    match rescan {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
