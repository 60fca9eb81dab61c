//! Cache command - inspect and remove history caches

use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{ArgusError, ArgusResult};
use crate::history::CacheStore;
use crate::ui::{self, UiContext};
use console::style;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> ArgusResult<()> {
    let cache_dir = config
        .cache
        .dir
        .clone()
        .unwrap_or_else(ConfigManager::default_cache_dir);

    match args.action {
        CacheAction::Info { repo } => show_info(&cache_dir, repo).await,
        CacheAction::Clear { repo, all, yes } => {
            if all {
                clear_all(&cache_dir, yes).await
            } else {
                clear_repo(&cache_dir, repo, yes).await
            }
        }
    }
}

/// Show cache state for one tree
async fn show_info(cache_dir: &Path, repo: Option<PathBuf>) -> ArgusResult<()> {
    let root = resolve_repo(repo)?;
    let store = CacheStore::for_repo(cache_dir, &root);

    println!("Tree:  {}", root.display());
    println!("Store: {}", store.path().display());

    match store.load().await? {
        Some(index) => {
            let checkpoint = index.checkpoint.get(..12).unwrap_or(&index.checkpoint);
            println!("Checkpoint: {}", style(checkpoint).cyan());
            println!("Entries:    {}", index.entries.len());
        }
        None => println!("No cache for this tree."),
    }

    Ok(())
}

/// Remove the cache of one tree
async fn clear_repo(cache_dir: &Path, repo: Option<PathBuf>, yes: bool) -> ArgusResult<()> {
    let root = resolve_repo(repo)?;
    let store = CacheStore::for_repo(cache_dir, &root);

    if !store.path().exists() {
        println!("No cache for {}.", root.display());
        return Ok(());
    }

    let ctx = UiContext::detect().with_auto_yes(yes);
    let prompt = format!("Remove the cached history for {}?", root.display());
    if !ui::confirm(&ctx, &prompt, false).await? {
        println!("Aborted.");
        return Ok(());
    }

    if store.remove().await? {
        ui::step_ok(&ctx, &format!("Removed {}", store.path().display()));
    }
    Ok(())
}

/// Remove every cached history under the cache directory
async fn clear_all(cache_dir: &Path, yes: bool) -> ArgusResult<()> {
    let history_dir = cache_dir.join("history");
    let stores = list_stores(&history_dir).await?;

    if stores.is_empty() {
        println!("No caches to clear.");
        return Ok(());
    }

    println!(
        "This will remove {} cached histor{}:",
        stores.len(),
        plural_y(stores.len())
    );
    for name in &stores {
        println!("  {} {}", style("*").red(), name);
    }
    println!();

    let ctx = UiContext::detect().with_auto_yes(yes);
    if !ui::confirm(&ctx, "Are you sure?", false).await? {
        println!("Aborted.");
        return Ok(());
    }

    debug!("Removing {}", history_dir.display());
    // Per-store removal takes each advisory lock, so a scan refreshing one
    // of these caches finishes before its files go away.
    for name in &stores {
        CacheStore::new(history_dir.join(name)).remove().await?;
    }
    match fs::remove_dir_all(&history_dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(ArgusError::io(
                format!("removing {}", history_dir.display()),
                e,
            ))
        }
    }

    ui::step_ok(&ctx, &format!("Cleared {} cache(s)", stores.len()));
    Ok(())
}

fn resolve_repo(repo: Option<PathBuf>) -> ArgusResult<PathBuf> {
    match repo {
        Some(path) => path
            .canonicalize()
            .map_err(|_| ArgusError::PathNotFound(path)),
        None => env::current_dir().map_err(|e| ArgusError::io("getting current directory", e)),
    }
}

/// Names of the index files under `history_dir`, lock and tmp files excluded.
async fn list_stores(history_dir: &Path) -> ArgusResult<Vec<String>> {
    let mut stores = Vec::new();
    let mut entries = match fs::read_dir(history_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stores),
        Err(e) => {
            return Err(ArgusError::io(
                format!("reading {}", history_dir.display()),
                e,
            ))
        }
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ArgusError::io(format!("reading {}", history_dir.display()), e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") {
            stores.push(name);
        }
    }
    stores.sort();
    Ok(stores)
}

fn plural_y(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}
