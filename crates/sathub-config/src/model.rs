//! Station configuration schema.
//!
//! The on-disk layout is a YAML document with four sections:
//!
//! ```yaml
//! station:
//!   token: "..."
//!   api_url: https://api.sathub.de
//! paths:
//!   watch: /home/pi/sathub/data      # or a list of paths
//!   processed: /home/pi/sathub/processed
//! intervals:
//!   health_check: 300
//!   process_delay: 60
//!   rescan: 0
//! options:
//!   insecure: false
//!   verbose: false
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Default SatHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.sathub.de";

/// Default health check interval in seconds.
pub const DEFAULT_HEALTH_CHECK_INTERVAL: u64 = 300;

/// Default delay in seconds before a new directory is inspected.
pub const DEFAULT_PROCESS_DELAY: u64 = 60;

/// Default location of the config file.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/sathub-client/config.yaml";

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Station identity and API endpoint
    pub station: StationConfig,
    /// Watched and archive directories
    pub paths: PathsConfig,
    /// Timing parameters
    #[serde(default)]
    pub intervals: IntervalsConfig,
    /// Optional switches
    #[serde(default)]
    pub options: OptionsConfig,
}

/// Station identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationConfig {
    /// Station token issued by SatHub
    #[serde(default)]
    pub token: String,

    /// Base URL of the SatHub API
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

/// Directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Watch roots; accepts a single path or a list
    #[serde(
        deserialize_with = "deserialize_watch_paths",
        serialize_with = "serialize_watch_paths"
    )]
    pub watch: Vec<PathBuf>,

    /// Archive root that finished passes are moved into
    pub processed: PathBuf,
}

/// Timing configuration, all values in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntervalsConfig {
    /// Interval between station health checks
    #[serde(default = "default_health_check")]
    pub health_check: u64,

    /// Delay before a newly detected directory is inspected
    #[serde(default = "default_process_delay")]
    pub process_delay: u64,

    /// Interval between periodic re-sweeps of the watch roots; 0 disables
    #[serde(default)]
    pub rescan: u64,
}

/// Optional switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OptionsConfig {
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,

    /// Enable debug logging
    #[serde(default)]
    pub verbose: bool,
}

/// Settings pushed by the server, either in a health response or over the
/// control channel. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    /// New health check interval in seconds
    #[serde(
        default,
        deserialize_with = "deserialize_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub health_check_interval: Option<u64>,

    /// New process delay in seconds
    #[serde(
        default,
        deserialize_with = "deserialize_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub process_delay: Option<u64>,
}

impl ServerSettings {
    /// True when the bag carries no timing values.
    pub fn is_empty(&self) -> bool {
        self.health_check_interval.is_none() && self.process_delay.is_none()
    }
}

impl ClientConfig {
    /// Validate the fields the client cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.station.token.trim().is_empty() {
            return Err(ConfigError::Invalid("station token is required".to_string()));
        }
        if self.station.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url is required".to_string()));
        }
        if self.paths.watch.is_empty() {
            return Err(ConfigError::Invalid("watch path is required".to_string()));
        }
        if self.paths.watch.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid("watch paths must not be empty".to_string()));
        }
        if self.paths.processed.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("processed path is required".to_string()));
        }
        if self.intervals.health_check == 0 {
            return Err(ConfigError::Invalid(
                "health_check interval must be positive".to_string(),
            ));
        }
        if self.intervals.process_delay == 0 {
            return Err(ConfigError::Invalid("process_delay must be positive".to_string()));
        }
        Ok(())
    }

    /// Copy server-pushed timing values into the persisted intervals.
    ///
    /// Zero values are ignored. Returns true if anything changed.
    pub fn apply_settings(&mut self, settings: &ServerSettings) -> bool {
        let mut changed = false;
        if let Some(secs) = settings.health_check_interval.filter(|s| *s > 0) {
            changed |= self.intervals.health_check != secs;
            self.intervals.health_check = secs;
        }
        if let Some(secs) = settings.process_delay.filter(|s| *s > 0) {
            changed |= self.intervals.process_delay != secs;
            self.intervals.process_delay = secs;
        }
        changed
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = dirs::home_dir().unwrap_or_default().join("sathub");
        Self {
            watch: vec![base.join("data")],
            processed: base.join("processed"),
        }
    }
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            health_check: DEFAULT_HEALTH_CHECK_INTERVAL,
            process_delay: DEFAULT_PROCESS_DELAY,
            rescan: 0,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_health_check() -> u64 {
    DEFAULT_HEALTH_CHECK_INTERVAL
}

fn default_process_delay() -> u64 {
    DEFAULT_PROCESS_DELAY
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

fn deserialize_watch_paths<'de, D>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

#[allow(clippy::ptr_arg)]
fn serialize_watch_paths<S>(
    paths: &Vec<PathBuf>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match paths.as_slice() {
        [single] => single.serialize(serializer),
        many => many.serialize(serializer),
    }
}

// The server is not strict about numeric types; accept 60, 60.0 or "60".
fn deserialize_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                Ok(Some(u))
            } else if let Some(f) = n.as_f64().filter(|f| f.is_finite() && *f >= 0.0) {
                Ok(Some(f as u64))
            } else {
                Err(D::Error::custom(format!("invalid seconds value: {}", n)))
            }
        }
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid seconds value '{}': {}", s, e))),
        Some(other) => Err(D::Error::custom(format!("invalid seconds value: {}", other))),
    }
}
