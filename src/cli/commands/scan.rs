//! Scan command - run checks over a package tree

use crate::check::{self, AddonSet, Finding, RunContext, SkippedCheck};
use crate::cli::args::{OutputFormat, ScanArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{ArgusError, ArgusResult};
use crate::repo::Snapshot;
use crate::ui::{self, ScanProgress, TaskSpinner, UiContext};
use chrono::Utc;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Execute the scan command
pub async fn execute(args: ScanArgs, manager: &ConfigManager, no_local: bool) -> ArgusResult<()> {
    let root = resolve_repo_root(&args)?;
    debug!("Scanning tree at {}", root.display());

    let config = load_scan_config(&args, manager, &root, no_local).await?;
    let kinds = check::resolve_checks(&args.checks, &config.scan.checks)?;

    // JSON goes to stdout; keep decorations off it
    let ctx = UiContext::detect().with_quiet(matches!(args.format, OutputFormat::Json));
    ui::intro(&ctx, "argus scan");

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Reading package tree...");
    let snapshot = match Snapshot::load(&root) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            spinner.stop_error("Package tree unreadable");
            return Err(e);
        }
    };
    spinner.stop(&format!(
        "{}: {} packages",
        snapshot.name(),
        snapshot.packages().len()
    ));

    let cache_dir = config
        .cache
        .dir
        .clone()
        .unwrap_or_else(ConfigManager::default_cache_dir);
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Preparing checks...");
    let init = {
        let run_ctx = RunContext {
            config: &config,
            snapshot: &snapshot,
            cache_dir,
            today,
        };
        let addons = AddonSet::new();
        check::init_checks(&run_ctx, &kinds, &addons).await
    };
    let (ready, skipped) = match init {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Check initialization failed");
            return Err(e);
        }
    };
    spinner.stop(&format!("{} check(s) ready", ready.len()));

    for skip in &skipped {
        ui::step_warn_hint(&ctx, &format!("{} skipped", skip.kind.name()), &skip.reason);
    }

    let jobs = config.scan.jobs;
    let snapshot = Arc::new(snapshot);
    let progress = ScanProgress::new(&ctx, snapshot.set_count());
    let findings = {
        let progress = progress.clone();
        check::run_checks(Arc::clone(&snapshot), ready, jobs, move || progress.tick()).await?
    };
    progress.finish();

    match args.format {
        OutputFormat::Plain => report_plain(&ctx, &findings, &skipped),
        OutputFormat::Json => report_json(&snapshot, today, &findings, &skipped)?,
    }

    Ok(())
}

fn resolve_repo_root(args: &ScanArgs) -> ArgusResult<PathBuf> {
    match args.repo {
        Some(ref path) => path
            .canonicalize()
            .map_err(|_| ArgusError::PathNotFound(path.clone())),
        None => env::current_dir().map_err(|e| ArgusError::io("getting current directory", e)),
    }
}

/// Merge the tree's `.argus.toml` over the global config, then fold in
/// command-line overrides.
async fn load_scan_config(
    args: &ScanArgs,
    manager: &ConfigManager,
    root: &Path,
    no_local: bool,
) -> ArgusResult<Config> {
    let local = if no_local {
        debug!("Local config discovery disabled (--no-local)");
        None
    } else {
        let found = ConfigManager::find_local_config(root);
        if let Some(ref path) = found {
            debug!("Found local config: {}", path.display());
        }
        found
    };

    let mut config = manager.load_merged(local.as_deref()).await?;
    if args.no_cache {
        config.cache.enabled = false;
    }
    if let Some(jobs) = args.jobs {
        config.scan.jobs = jobs;
    }
    Ok(config)
}

fn report_plain(ctx: &UiContext, findings: &[Finding], skipped: &[SkippedCheck]) {
    for finding in findings {
        println!("{finding}");
    }

    if findings.is_empty() {
        let note = if skipped.is_empty() {
            "No findings".to_string()
        } else {
            format!("No findings ({} check(s) skipped)", skipped.len())
        };
        ui::outro_success(ctx, &note);
    } else {
        ui::outro_warn(ctx, &format!("{} finding(s)", findings.len()));
    }
}

fn report_json(
    snapshot: &Snapshot,
    today: chrono::NaiveDate,
    findings: &[Finding],
    skipped: &[SkippedCheck],
) -> ArgusResult<()> {
    #[derive(serde::Serialize)]
    struct ScanReport<'a> {
        repo: &'a str,
        today: chrono::NaiveDate,
        packages: usize,
        findings: &'a [Finding],
        skipped: &'a [SkippedCheck],
    }

    let report = ScanReport {
        repo: snapshot.name(),
        today,
        packages: snapshot.packages().len(),
        findings,
        skipped,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
