//! The client's main loop.

use anyhow::{anyhow, Context, Result};
use sathub_api::ApiClient;
use sathub_config::{ClientConfig, ConfigLoader, RuntimeTiming, ServerSettings, TimingChange};
use sathub_watch::{PassUploader, PassWatcher, PassWatcherConfig};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::control::{ControlChannel, ControlMessage};

const CONTROL_QUEUE: usize = 16;

/// Run the client until a shutdown signal or a restart request.
///
/// Returns an error when the server asked for a restart so the process exits
/// non-zero and gets restarted by its service manager.
pub async fn run(config_path: &Path, mut config: ClientConfig) -> Result<()> {
    info!("Starting SatHub client");
    info!("API URL: {}", config.station.api_url);
    for root in &config.paths.watch {
        info!("Watch path: {}", root.display());
    }
    info!("Processed path: {}", config.paths.processed.display());

    let client = Arc::new(
        ApiClient::new(
            config.station.api_url.as_str(),
            &config.station.token,
            config.options.insecure,
        )
        .context("Failed to create API client")?,
    );

    let health = client
        .station_health()
        .await
        .context("Initial health check failed")?;
    info!("Station health check passed (station {})", health.station_id);

    let timing = Arc::new(RuntimeTiming::from_config(&config.intervals));
    timing.apply(&health.settings);

    let uploader: Arc<dyn PassUploader> = client.clone();
    let watcher_config = PassWatcherConfig::from_client_config(&config, timing.clone());
    let mut watcher = PassWatcher::new(watcher_config, uploader)?;
    watcher.start().await.context("Failed to start pass watcher")?;

    let (control_tx, mut control_rx) = mpsc::channel(CONTROL_QUEUE);
    let control_task = if health.station_id.is_empty() {
        warn!("Server did not report a station id, control channel disabled");
        None
    } else {
        match ControlChannel::new(
            &config.station.api_url,
            &health.station_id,
            config.station.token.clone(),
            config.options.insecure,
            control_tx,
        ) {
            Ok(channel) => Some(channel.spawn()),
            Err(e) => {
                warn!("Control channel disabled: {:#}", e);
                None
            }
        }
    };

    let mut ticker = health_ticker(&timing);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break Ok(());
            }
            Some(message) = control_rx.recv() => match message {
                ControlMessage::SettingsChanged(settings) => {
                    apply_settings_update(&mut config, config_path, &timing, &settings).await;
                    ticker = health_ticker(&timing);
                }
                ControlMessage::RestartRequested => {
                    warn!("Restarting on server request");
                    break Err(anyhow!("restart requested by server"));
                }
            },
            _ = ticker.tick() => {
                match client.station_health().await {
                    Ok(health) => {
                        debug!("Health check OK");
                        timing.apply(&health.settings);
                    }
                    Err(e) => warn!("Health check failed: {}", e),
                }
                // pass uploads apply health settings to the shared timing too
                refresh_ticker(&mut ticker, &timing);
            }
        }
    };

    if let Err(e) = watcher.stop().await {
        error!("Failed to stop pass watcher: {}", e);
    }
    if let Some(task) = control_task {
        task.abort();
    }

    outcome
}

/// Apply settings pushed over the control channel and persist them.
///
/// A failed save is logged; the new values stay in effect for this run.
pub async fn apply_settings_update(
    config: &mut ClientConfig,
    config_path: &Path,
    timing: &RuntimeTiming,
    settings: &ServerSettings,
) -> TimingChange {
    let change = timing.apply(settings);

    if config.apply_settings(settings) {
        match ConfigLoader::save_to_file(config, config_path).await {
            Ok(()) => info!("Saved updated settings to {}", config_path.display()),
            Err(e) => error!("Failed to save updated settings: {}", e),
        }
    }

    change
}

fn health_ticker(timing: &RuntimeTiming) -> Interval {
    let period = timing.health_check_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Rebuild the ticker if the shared interval no longer matches its period.
fn refresh_ticker(ticker: &mut Interval, timing: &RuntimeTiming) -> bool {
    if ticker.period() == timing.health_check_interval() {
        return false;
    }
    debug!(
        "Health check interval changed to {}s",
        timing.health_check_interval().as_secs()
    );
    *ticker = health_ticker(timing);
    true
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received interrupt"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
