//! Configuration schema for argus
//!
//! Configuration is stored at `~/.config/argus/config.toml`; a package tree
//! may carry a `.argus.toml` at its root that overrides individual keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan defaults
    pub scan: ScanConfig,

    /// History cache settings
    pub cache: CacheConfig,

    /// Stabilization-overdue check settings
    pub stabilize: StabilizeConfig,

    /// Deprecated-inherit check settings
    pub deprecated: DeprecatedConfig,
}

/// Scan defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Worker tasks for check execution (0 = all available cores)
    pub jobs: usize,

    /// Checks to run when none are named on the command line
    /// (empty = every registered check)
    pub checks: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            checks: vec![],
        }
    }
}

/// History cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the persistent history cache (default: true)
    pub enabled: bool,

    /// Cache directory override (default: ~/.cache/argus)
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

/// Stabilization-overdue check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizeConfig {
    /// Tree name the check applies to; other trees are skipped
    pub reference_repo: String,

    /// Days a version must stay unstable before stabilization is due
    pub stable_days: u32,

    /// Waiting period for slower architectures
    pub extended_days: u32,

    /// Architectures that get the extended waiting period
    pub extended_arches: Vec<String>,
}

impl Default for StabilizeConfig {
    fn default() -> Self {
        Self {
            reference_repo: "core".to_string(),
            stable_days: 30,
            extended_days: 90,
            extended_arches: vec![],
        }
    }
}

/// Deprecated-inherit check configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeprecatedConfig {
    /// Deprecated helper name mapped to its replacement
    /// (empty string = no replacement)
    pub inherits: BTreeMap<String, String>,
}
