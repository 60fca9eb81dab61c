//! CLI argument definitions using clap derive

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Argus - Package Tree Auditor
///
/// Scans a version-controlled package tree for policy violations,
/// backed by an incremental cache over the tree's commit history.
#[derive(Parser, Debug)]
#[command(name = "argus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ARGUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .argus.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Emit log records as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a package tree and report findings
    Scan(ScanArgs),

    /// List available checks
    Checks,

    /// Manage history caches
    Cache(CacheArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the scan command
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Package tree to scan (defaults to current directory)
    #[arg(short, long)]
    pub repo: Option<PathBuf>,

    /// Checks to run (comma-separated, defaults to all)
    #[arg(long, value_delimiter = ',')]
    pub checks: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,

    /// Evaluation date for age-based checks (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub today: Option<NaiveDate>,

    /// Disable the history cache for this scan
    #[arg(long)]
    pub no_cache: bool,

    /// Worker count (0 = number of CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., stabilize.stable_days)
        key: String,
        /// Value to set
        value: String,
        /// Write to project-local .argus.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}

/// Output format for scan findings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Simple text (one finding per line)
    Plain,
    /// JSON report
    Json,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cache info for a package tree
    Info {
        /// Package tree (defaults to current directory)
        #[arg(short, long)]
        repo: Option<PathBuf>,
    },

    /// Remove cached history
    Clear {
        /// Package tree whose cache to remove (defaults to current directory)
        #[arg(short, long, conflicts_with = "all")]
        repo: Option<PathBuf>,

        /// Remove every cached history
        #[arg(long)]
        all: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Parse a calendar date in YYYY-MM-DD format
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{s}': {e} (expected YYYY-MM-DD)"))
}
