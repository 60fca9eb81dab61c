//! Configuration management for argus

pub mod schema;

pub use schema::Config;

use crate::error::{ArgusError, ArgusResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Filename of a per-tree configuration overlay.
pub const LOCAL_CONFIG_NAME: &str = ".argus.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("argus")
            .join("config.toml")
    }

    /// Get the default cache directory path
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("argus")
    }

    /// Per-tree config overlay in `tree_root`, if one exists
    pub fn find_local_config(tree_root: &Path) -> Option<PathBuf> {
        let path = tree_root.join(LOCAL_CONFIG_NAME);
        path.is_file().then_some(path)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> ArgusResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration with an optional per-tree overlay merged on top.
    /// Overlay keys win; absent keys keep the global (or default) value.
    pub async fn load_merged(&self, local: Option<&Path>) -> ArgusResult<Config> {
        let mut merged = self.raw_table(&self.config_path).await?;
        if let Some(local) = local {
            debug!("merging local config {}", local.display());
            merge_value(&mut merged, self.raw_table(local).await?);
        }
        merged.try_into().map_err(|e: toml::de::Error| {
            ArgusError::ConfigInvalid {
                path: local
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.config_path.clone()),
                reason: e.to_string(),
            }
        })
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ArgusResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ArgusError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| ArgusError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> ArgusResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            ArgusError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    pub async fn ensure_config_dir(&self) -> ArgusResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ArgusError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    async fn raw_table(&self, path: &Path) -> ArgusResult<toml::Value> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(ArgusError::io(
                    format!("reading config from {}", path.display()),
                    e,
                ))
            }
        };
        toml::from_str(&content).map_err(|e| ArgusError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively overlay `overlay` onto `base`; tables merge key-wise,
/// everything else is replaced wholesale.
fn merge_value(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
