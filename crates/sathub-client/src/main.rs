use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use sathub_client::{cli::Cli, runtime};
use sathub_config::ConfigLoader;

const LOG_TARGETS: [&str; 4] = ["sathub_client", "sathub_watch", "sathub_api", "sathub_config"];

fn log_filter(verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if verbose { "debug" } else { "info" };
    let directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect();
    EnvFilter::new(directives.join(","))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging starts before the config is read so first-run notices show up
    let (filter, filter_handle) = reload::Layer::new(log_filter(cli.verbose));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    // Both TLS stacks run on ring
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = ConfigLoader::load_or_default(&cli.config)
        .await
        .context("Failed to load configuration")?;
    config.validate().with_context(|| {
        format!(
            "Invalid configuration, please edit {}",
            cli.config.display()
        )
    })?;

    if config.options.verbose && !cli.verbose {
        if let Err(e) = filter_handle.reload(log_filter(true)) {
            debug!("Could not raise log level: {}", e);
        }
    }

    runtime::run(&cli.config, config).await
}
