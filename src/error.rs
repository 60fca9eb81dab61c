//! Error types for argus
//!
//! All modules use `ArgusResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for argus operations
pub type ArgusResult<T> = Result<T, ArgusError>;

/// All errors that can occur in argus
#[derive(Error, Debug)]
pub enum ArgusError {
    // Package tree errors
    #[error("Not a package tree: {0} (no repo.toml found)")]
    NotAPackageTree(PathBuf),

    #[error("Invalid manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // History source errors
    #[error("Not a git checkout: {0}")]
    NotAGitRepository(PathBuf),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl ArgusError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotAPackageTree(_) => {
                Some("Pass --repo or run inside a package tree (a directory with repo.toml)")
            }
            Self::NotAGitRepository(_) => {
                Some("History-backed checks need the target tree to be a git checkout")
            }
            _ => None,
        }
    }

    /// Whether this error came from the commit-history source (no checkout,
    /// git missing or failing). Such failures only disable the checks that
    /// need history; anything else during a cache refresh, like an unusable
    /// store directory, aborts the run.
    pub fn is_history_source_failure(&self) -> bool {
        matches!(
            self,
            Self::NotAGitRepository(_) | Self::CommandFailed { .. } | Self::CommandExecution { .. }
        )
    }
}
