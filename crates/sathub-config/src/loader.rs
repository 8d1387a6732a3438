//! Loading and saving the YAML config file.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::model::ClientConfig;

/// Expand a leading `~/` to the user's home directory.
///
/// Paths without the prefix, or when no home directory can be determined,
/// are returned unchanged.
pub fn expand_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Reads and writes [`ClientConfig`] files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a config file.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<ClientConfig> {
        let path = expand_path(path);
        let data = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;

        let mut config: ClientConfig = serde_yaml::from_str(&data).map_err(ConfigError::Parse)?;
        Self::expand_config_paths(&mut config);
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the config file, or create one with default values if it does not
    /// exist yet.
    ///
    /// The returned default config is not validated: it has no station token,
    /// so callers should run [`ClientConfig::validate`] before using it.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<ClientConfig> {
        let path = expand_path(path);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Self::load_from_file(&path).await;
        }

        let config = ClientConfig::default();
        match Self::save_to_file(&config, &path).await {
            Ok(()) => {
                info!("Created default config file at: {}", path.display());
                warn!("Please edit this file and set your station token");
            }
            Err(e) => {
                warn!("Could not create default config file: {}", e);
            }
        }

        Ok(config)
    }

    /// Write a config file, creating its directory if needed.
    ///
    /// On Unix the file is restricted to the owner since it holds the
    /// station token.
    pub async fn save_to_file(config: &ClientConfig, path: impl AsRef<Path>) -> Result<()> {
        let path = expand_path(path);

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ConfigError::Write {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let data = serde_yaml::to_string(config).map_err(ConfigError::Serialize)?;
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };

        tokio::fs::write(&path, data).await.map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_err)?;
        }

        debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    fn expand_config_paths(config: &mut ClientConfig) {
        for watch in &mut config.paths.watch {
            *watch = expand_path(&*watch);
        }
        config.paths.processed = expand_path(&config.paths.processed);
    }
}
