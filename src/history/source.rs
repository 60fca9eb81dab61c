//! History source boundary
//!
//! The cache replays commits through this trait and never touches version
//! control directly, so tests can drive it with synthetic histories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ArgusResult;
use crate::pkg::{KeywordSet, PackageId};

/// Resulting state of one package manifest after a commit.
#[derive(Debug, Clone)]
pub struct TouchedPackage {
    pub id: PackageId,
    pub keywords: KeywordSet,
}

/// One commit in a package tree's history.
#[derive(Debug, Clone)]
pub struct HistoryCommit {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    /// Post-commit state of every manifest the commit added or modified.
    /// Removals are absent: a deleted manifest has no resulting state.
    pub packages: Vec<TouchedPackage>,
}

/// A linear view over a package tree's commit history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Commit hash the checkout currently points at.
    async fn head(&self) -> ArgusResult<String>;

    /// Whether `commit` is still reachable in this history.
    async fn contains(&self, commit: &str) -> ArgusResult<bool>;

    /// Commits strictly after `checkpoint` up to and including HEAD, in
    /// topological order (parents before children). `None` replays from the
    /// first commit.
    async fn commits_since(&self, checkpoint: Option<&str>) -> ArgusResult<Vec<HistoryCommit>>;
}
