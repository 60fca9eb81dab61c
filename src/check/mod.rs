//! Check framework
//!
//! Checks are registered statically, declare the stream shape they consume
//! and the shared addons they need, and either initialize into runnable
//! instances or opt out with a skip reason when a precondition does not
//! hold. A skipped check never fails the run.

pub mod deprecated;
pub mod stabilize;

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use futures_util::future::try_join_all;
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio::task;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ArgusError, ArgusResult};
use crate::history::{CacheStore, GitHistorySource, HistoryCache};
use crate::pkg::PackageId;
use crate::repo::{PackageRecord, Snapshot};

pub use deprecated::DeprecatedInherit;
pub use stabilize::StabilizeDue;

/// Stream shape a check consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScope {
    /// One package version at a time.
    Version,
    /// All versions of one category/name together.
    PackageSet,
}

impl fmt::Display for TargetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Version => "version",
            Self::PackageSet => "package-set",
        })
    }
}

/// Shared state a check can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddonKind {
    /// The replayed commit-history cache.
    History,
}

impl fmt::Display for AddonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::History => "history",
        })
    }
}

/// Every check argus knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckKind {
    DeprecatedInherit,
    Stabilize,
}

impl CheckKind {
    pub const ALL: [CheckKind; 2] = [CheckKind::DeprecatedInherit, CheckKind::Stabilize];

    pub fn name(self) -> &'static str {
        match self {
            Self::DeprecatedInherit => "deprecated-inherit",
            Self::Stabilize => "stabilize",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn scope(self) -> TargetScope {
        match self {
            Self::DeprecatedInherit => TargetScope::Version,
            Self::Stabilize => TargetScope::PackageSet,
        }
    }

    pub fn required_addons(self) -> &'static [AddonKind] {
        match self {
            Self::DeprecatedInherit => &[],
            Self::Stabilize => &[AddonKind::History],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::DeprecatedInherit => "packages inheriting deprecated build helpers",
            Self::Stabilize => "unstable versions that outlived their stabilization window",
        }
    }

    /// Initialize the check for one run, or skip it with a reason.
    pub async fn init(self, ctx: &RunContext<'_>, addons: &AddonSet) -> ArgusResult<CheckInit> {
        match self {
            Self::DeprecatedInherit => Ok(deprecated::DeprecatedInheritCheck::init(ctx)),
            Self::Stabilize => stabilize::StabilizeCheck::init(ctx, addons).await,
        }
    }
}

/// Everything a check can see while initializing and running.
pub struct RunContext<'a> {
    pub config: &'a Config,
    pub snapshot: &'a Snapshot,
    pub cache_dir: PathBuf,
    /// Reference date for elapsed-time policies; injected, never the wall
    /// clock read inside a check.
    pub today: NaiveDate,
}

/// Outcome of initializing one check.
pub enum CheckInit {
    Ready(Box<dyn Check>),
    Skipped(String),
}

/// A runnable check instance.
pub trait Check: Send + Sync {
    fn kind(&self) -> CheckKind;

    /// Inspect one target and append findings. Must not mutate shared
    /// state; workers call this concurrently over disjoint targets.
    fn feed(&self, target: Target<'_>, findings: &mut Vec<Finding>);
}

/// One unit of work handed to a check.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Version(&'a PackageRecord),
    Set(&'a [PackageRecord]),
}

/// Shared addon instances, constructed at most once per run.
///
/// A history-source failure is not fatal to the run; its text becomes the
/// skip reason of every check that needed the addon. An unusable cache-store
/// directory, by contrast, propagates and aborts the run.
#[derive(Default)]
pub struct AddonSet {
    history: OnceCell<Result<Arc<HistoryCache>, String>>,
}

impl AddonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The refreshed history cache for the target tree, or the skip reason
    /// it could not come up. The first caller builds it; later callers share
    /// the same outcome.
    pub async fn history(
        &self,
        ctx: &RunContext<'_>,
    ) -> ArgusResult<Result<Arc<HistoryCache>, String>> {
        self.history
            .get_or_try_init(|| async {
                match build_history(ctx).await {
                    Ok(cache) => Ok(Ok(cache)),
                    Err(e) if e.is_history_source_failure() => Ok(Err(e.to_string())),
                    Err(e) => Err(e),
                }
            })
            .await
            .cloned()
    }
}

async fn build_history(ctx: &RunContext<'_>) -> ArgusResult<Arc<HistoryCache>> {
    let source = GitHistorySource::discover(ctx.snapshot.root()).await?;
    let store = CacheStore::for_repo(&ctx.cache_dir, ctx.snapshot.root());
    let mut cache = HistoryCache::new(store);
    let stats = cache.ensure_current(&source).await?;
    debug!(
        commits = stats.commits_replayed,
        entries = stats.entries_added,
        "history addon ready"
    );
    Ok(Arc::new(cache))
}

/// A check that opted out of the run.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedCheck {
    #[serde(serialize_with = "serialize_kind")]
    pub kind: CheckKind,
    pub reason: String,
}

fn serialize_kind<S: serde::Serializer>(kind: &CheckKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.name())
}

/// Map check names to kinds. Names given on the command line win over
/// configured names; both empty means every registered check.
pub fn resolve_checks(cli: &[String], configured: &[String]) -> ArgusResult<Vec<CheckKind>> {
    let names = if cli.is_empty() { configured } else { cli };
    if names.is_empty() {
        return Ok(CheckKind::ALL.to_vec());
    }
    let mut kinds = Vec::new();
    for name in names {
        let kind = CheckKind::from_name(name).ok_or_else(|| {
            let known = CheckKind::ALL.map(CheckKind::name).join(", ");
            ArgusError::User(format!("unknown check '{name}' (available: {known})"))
        })?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// Initialize `kinds` against the run context. Precondition failures come
/// back as skips, not errors.
pub async fn init_checks(
    ctx: &RunContext<'_>,
    kinds: &[CheckKind],
    addons: &AddonSet,
) -> ArgusResult<(Vec<Box<dyn Check>>, Vec<SkippedCheck>)> {
    let mut ready = Vec::new();
    let mut skipped = Vec::new();
    for kind in kinds {
        match kind.init(ctx, addons).await? {
            CheckInit::Ready(check) => ready.push(check),
            CheckInit::Skipped(reason) => {
                info!(check = kind.name(), %reason, "check skipped");
                skipped.push(SkippedCheck {
                    kind: *kind,
                    reason,
                });
            }
        }
    }
    Ok((ready, skipped))
}

/// Run initialized checks over every package set, fanning sets out to
/// blocking workers. `on_set_done` fires once per finished set (progress
/// reporting). Findings come back sorted and deduplicated.
pub async fn run_checks<F>(
    snapshot: Arc<Snapshot>,
    checks: Vec<Box<dyn Check>>,
    jobs: usize,
    on_set_done: F,
) -> ArgusResult<Vec<Finding>>
where
    F: Fn() + Send + Sync + 'static,
{
    if checks.is_empty() || snapshot.set_count() == 0 {
        return Ok(Vec::new());
    }
    let jobs = effective_jobs(jobs, snapshot.set_count());
    debug!(jobs, sets = snapshot.set_count(), "running checks");

    let checks = Arc::new(checks);
    let cursor = Arc::new(AtomicUsize::new(0));
    let on_set_done = Arc::new(on_set_done);

    let mut workers = Vec::with_capacity(jobs);
    for _ in 0..jobs {
        let snapshot = Arc::clone(&snapshot);
        let checks = Arc::clone(&checks);
        let cursor = Arc::clone(&cursor);
        let on_set_done = Arc::clone(&on_set_done);
        workers.push(task::spawn_blocking(move || {
            let mut findings = Vec::new();
            loop {
                let i = cursor.fetch_add(1, Ordering::Relaxed);
                if i >= snapshot.set_count() {
                    break;
                }
                let set = snapshot.set(i);
                for check in checks.iter() {
                    match check.kind().scope() {
                        TargetScope::Version => {
                            for record in set {
                                check.feed(Target::Version(record), &mut findings);
                            }
                        }
                        TargetScope::PackageSet => check.feed(Target::Set(set), &mut findings),
                    }
                }
                on_set_done();
            }
            findings
        }));
    }

    let mut findings: Vec<Finding> = try_join_all(workers)
        .await
        .map_err(|e| ArgusError::Internal(format!("check worker failed: {e}")))?
        .into_iter()
        .flatten()
        .collect();
    findings.sort();
    findings.dedup();
    Ok(findings)
}

fn effective_jobs(configured: usize, sets: usize) -> usize {
    let jobs = if configured == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        configured
    };
    jobs.clamp(1, sets.max(1))
}

/// One finding produced by a check run. Value equality over all fields is
/// the deduplication contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "kebab-case")]
pub enum Finding {
    DeprecatedInherit(DeprecatedInherit),
    Stabilize(StabilizeDue),
}

impl Finding {
    pub fn kind(&self) -> CheckKind {
        match self {
            Self::DeprecatedInherit(_) => CheckKind::DeprecatedInherit,
            Self::Stabilize(_) => CheckKind::Stabilize,
        }
    }

    pub fn package(&self) -> &PackageId {
        match self {
            Self::DeprecatedInherit(f) => &f.pkg,
            Self::Stabilize(f) => &f.pkg,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeprecatedInherit(inner) => write!(f, "{}: {}", self.package(), inner),
            Self::Stabilize(inner) => write!(f, "{}: {}", self.package(), inner),
        }
    }
}

impl Ord for Finding {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.package()
            .cmp(other.package())
            .then_with(|| self.kind().name().cmp(other.kind().name()))
            .then_with(|| match (self, other) {
                (Self::DeprecatedInherit(a), Self::DeprecatedInherit(b)) => a.cmp(b),
                (Self::Stabilize(a), Self::Stabilize(b)) => a.cmp(b),
                // Distinct kinds were already ordered by name.
                _ => std::cmp::Ordering::Equal,
            })
    }
}

impl PartialOrd for Finding {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
