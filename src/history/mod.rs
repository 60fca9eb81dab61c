//! Historical-state cache
//!
//! Maps (package identity, keyword set) to the earliest commit at which that
//! exact set was observed. Built by replaying the tree's commit history once
//! in full, then kept current by replaying only commits past a persisted
//! checkpoint. All mutation happens inside `ensure_current`; afterwards the
//! cache is a read-only lookup table.

pub mod git;
pub mod source;
pub mod store;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::ArgusResult;
use crate::pkg::{KeywordSet, PackageId};

pub use git::GitHistorySource;
pub use source::{HistoryCommit, HistorySource, TouchedPackage};
pub use store::{CacheStore, StoredEntry, CACHE_SCHEMA};

/// Where a (package, keyword set) pair first appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub commit: String,
    pub timestamp: DateTime<Utc>,
}

/// Work done by one `ensure_current` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub commits_replayed: usize,
    pub entries_added: usize,
}

/// The replay index plus its backing store.
pub struct HistoryCache {
    store: CacheStore,
    index: HashMap<PackageId, HashMap<KeywordSet, Origin>>,
    checkpoint: Option<String>,
}

impl HistoryCache {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            index: HashMap::new(),
            checkpoint: None,
        }
    }

    /// Bring the index up to the source's HEAD.
    ///
    /// Loads the persisted index (absent, corrupt, or schema-mismatched
    /// files mean a full replay), drops it if its checkpoint is no longer in
    /// the history, replays outstanding commits in committer-timestamp
    /// order, and persists the result. The store lock is held for the whole
    /// load/replay/write cycle.
    pub async fn ensure_current(&mut self, source: &dyn HistorySource) -> ArgusResult<RefreshStats> {
        let _lock = self.store.lock().await?;
        let head = source.head().await?;

        self.index.clear();
        self.checkpoint = None;
        if let Some(loaded) = self.store.load().await? {
            match decode(loaded.entries) {
                Some(index) => {
                    self.index = index;
                    self.checkpoint = Some(loaded.checkpoint);
                }
                None => warn!("discarding history cache with undecodable entries"),
            }
        }

        if self.checkpoint.as_deref() == Some(head.as_str()) {
            debug!("history cache already at {head}");
            return Ok(RefreshStats::default());
        }
        if let Some(cp) = &self.checkpoint {
            if !source.contains(cp).await? {
                warn!("checkpoint {cp} vanished from history, replaying from scratch");
                self.index.clear();
                self.checkpoint = None;
            }
        }

        let mut commits = source.commits_since(self.checkpoint.as_deref()).await?;
        // Committer-timestamp order decides which commit counts as the
        // origin; the stable sort keeps the source's topological order for
        // equal timestamps.
        commits.sort_by_key(|c| c.timestamp);

        let mut added = 0;
        for commit in &commits {
            for touched in &commit.packages {
                let versions = self.index.entry(touched.id.clone()).or_default();
                // First observation wins; re-observing a set a package
                // already had leaves the original untouched.
                if !versions.contains_key(&touched.keywords) {
                    versions.insert(
                        touched.keywords.clone(),
                        Origin {
                            commit: commit.hash.clone(),
                            timestamp: commit.timestamp,
                        },
                    );
                    added += 1;
                }
            }
        }

        self.store.write(self.encode(), &head).await?;
        self.checkpoint = Some(head);
        info!(
            commits = commits.len(),
            added,
            total = self.len(),
            "history cache refreshed"
        );
        Ok(RefreshStats {
            commits_replayed: commits.len(),
            entries_added: added,
        })
    }

    /// Origin of the given (package, keyword set) pair, if ever observed.
    pub fn lookup(&self, id: &PackageId, keywords: &KeywordSet) -> Option<&Origin> {
        self.index.get(id)?.get(keywords)
    }

    /// Commit the index is current to.
    pub fn checkpoint(&self) -> Option<&str> {
        self.checkpoint.as_deref()
    }

    /// Number of indexed (package, keyword set) pairs.
    pub fn len(&self) -> usize {
        self.index.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    fn encode(&self) -> Vec<StoredEntry> {
        let mut entries = Vec::with_capacity(self.len());
        for (id, versions) in &self.index {
            for (keywords, origin) in versions {
                entries.push(StoredEntry {
                    category: id.category.clone(),
                    name: id.name.clone(),
                    slot: id.slot.clone(),
                    version: id.version.clone(),
                    keywords: keywords.labels(),
                    commit: origin.commit.clone(),
                    timestamp: origin.timestamp.timestamp(),
                });
            }
        }
        entries
    }
}

fn decode(entries: Vec<StoredEntry>) -> Option<HashMap<PackageId, HashMap<KeywordSet, Origin>>> {
    let mut index: HashMap<PackageId, HashMap<KeywordSet, Origin>> = HashMap::new();
    for e in entries {
        let timestamp = DateTime::<Utc>::from_timestamp(e.timestamp, 0)?;
        let id = PackageId::new(e.category, e.name, e.slot, e.version);
        let keywords = KeywordSet::from_labels(&e.keywords);
        index.entry(id).or_default().insert(
            keywords,
            Origin {
                commit: e.commit,
                timestamp,
            },
        );
    }
    Some(index)
}
