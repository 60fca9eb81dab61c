//! Argus - Package Tree Auditor
//!
//! CLI entry point that dispatches to subcommands.

use argus::cli::{Cli, Commands};
use argus::config::ConfigManager;
use argus::error::ArgusResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ArgusResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("argus=warn"),
        1 => EnvFilter::new("argus=info"),
        _ => EnvFilter::new("argus=debug"),
    };

    // Logs go to stderr; stdout is reserved for findings and reports.
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    // Completions don't need config loading
    if let Commands::Completions { shell } = cli.command {
        return argus::cli::commands::completions(shell);
    }

    let manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Scan discovers the local overlay at the tree root itself; the other
    // commands see the overlay of the current directory, if any.
    match cli.command {
        Commands::Completions { .. } => unreachable!("Completions handled above"),
        Commands::Scan(args) => argus::cli::commands::scan(args, &manager, cli.no_local).await,
        Commands::Checks => argus::cli::commands::checks(),
        Commands::Cache(args) => {
            let config = load_cwd_config(&manager, cli.no_local).await?;
            argus::cli::commands::cache(args, &config).await
        }
        Commands::Config(args) => {
            let config = load_cwd_config(&manager, cli.no_local).await?;
            argus::cli::commands::config(args, &manager, &config).await
        }
    }
}

async fn load_cwd_config(manager: &ConfigManager, no_local: bool) -> ArgusResult<argus::config::Config> {
    let local = if no_local {
        debug!("Local config discovery disabled (--no-local)");
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| argus::error::ArgusError::io("getting current directory", e))?;
        let found = ConfigManager::find_local_config(&cwd);
        if let Some(ref path) = found {
            debug!("Found local config: {}", path.display());
        }
        found
    };
    manager.load_merged(local.as_deref()).await
}
