use clap::Parser;
use sathub_config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sathub-client")]
#[command(about = "SatHub Data Client for uploading satellite captures")]
#[command(long_about = "Monitors the directories a decoder writes satellite passes into and uploads \
each finished pass to your SatHub station. Configuration is loaded from a YAML file; a default one \
is created on first run.")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["sathub-client"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_flags() {
        let cli =
            Cli::try_parse_from(["sathub-client", "--config", "/etc/sathub.yaml", "-v"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/sathub.yaml"));
        assert!(cli.verbose);
    }
}
