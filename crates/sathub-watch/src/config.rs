//! Configuration for the pass watcher.

use sathub_config::{ClientConfig, RuntimeTiming};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything the pass watcher needs to run.
#[derive(Debug, Clone)]
pub struct PassWatcherConfig {
    /// Directories whose immediate children are pass candidates
    pub watch_roots: Vec<PathBuf>,
    /// Directory finished passes are moved into
    pub archive_root: PathBuf,
    /// Process delay, shared with whoever applies server settings
    pub timing: Arc<RuntimeTiming>,
    /// Interval of periodic re-sweeps; `None` disables them
    pub rescan_interval: Option<Duration>,
}

impl PassWatcherConfig {
    /// Create a configuration with default timing and no periodic sweeps.
    pub fn new(watch_roots: Vec<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            watch_roots,
            archive_root: archive_root.into(),
            timing: Arc::new(RuntimeTiming::default()),
            rescan_interval: None,
        }
    }

    /// Derive the watcher configuration from the client configuration.
    pub fn from_client_config(config: &ClientConfig, timing: Arc<RuntimeTiming>) -> Self {
        Self::new(config.paths.watch.clone(), config.paths.processed.clone())
            .with_timing(timing)
            .with_rescan_interval(Duration::from_secs(config.intervals.rescan))
    }

    /// Share an existing timing handle.
    pub fn with_timing(mut self, timing: Arc<RuntimeTiming>) -> Self {
        self.timing = timing;
        self
    }

    /// Set the periodic re-sweep interval. Zero disables it.
    pub fn with_rescan_interval(mut self, interval: Duration) -> Self {
        self.rescan_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Add another watch root.
    pub fn with_watch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.watch_roots.push(root.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_client_config() {
        let mut client = ClientConfig::default();
        client.paths.watch = vec![PathBuf::from("/srv/data")];
        client.paths.processed = PathBuf::from("/srv/processed");
        client.intervals.process_delay = 5;

        let timing = Arc::new(RuntimeTiming::from_config(&client.intervals));
        let config = PassWatcherConfig::from_client_config(&client, Arc::clone(&timing));

        assert_eq!(config.watch_roots, vec![PathBuf::from("/srv/data")]);
        assert_eq!(config.archive_root, PathBuf::from("/srv/processed"));
        assert_eq!(config.rescan_interval, None);
        assert!(Arc::ptr_eq(&config.timing, &timing));
        assert_eq!(config.timing.process_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_builders() {
        let config = PassWatcherConfig::new(vec![], "/srv/processed")
            .with_watch_root("/srv/a")
            .with_watch_root("/srv/b")
            .with_rescan_interval(Duration::from_secs(600));

        assert_eq!(config.watch_roots.len(), 2);
        assert_eq!(config.rescan_interval, Some(Duration::from_secs(600)));

        let config = config.with_rescan_interval(Duration::ZERO);
        assert_eq!(config.rescan_interval, None);
    }
}
