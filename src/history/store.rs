//! Durable persistence for the history index
//!
//! One JSON document per package tree under `<cache-dir>/history/`, written
//! atomically (temp file, fsync, rename) and guarded by an advisory file
//! lock so concurrent runs never interleave a load/replay/write cycle.

use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{ArgusError, ArgusResult};
use crate::pkg::Version;

/// Bumped whenever the stored layout changes; a mismatch discards the file.
pub const CACHE_SCHEMA: u32 = 1;

/// One persisted index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub category: String,
    pub name: String,
    pub slot: String,
    pub version: Version,
    /// Canonical keyword labels, ascending by architecture.
    pub keywords: Vec<String>,
    pub commit: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredIndex {
    schema: u32,
    checkpoint: String,
    entries: Vec<StoredEntry>,
}

/// Contents of a successfully loaded store file.
#[derive(Debug)]
pub struct LoadedIndex {
    pub checkpoint: String,
    pub entries: Vec<StoredEntry>,
}

/// Handle to one tree's on-disk index file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    /// Store backed by an explicit file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store for the tree at `repo_root`, filed under `cache_dir` by a
    /// digest of the canonical root path.
    pub fn for_repo(cache_dir: &Path, repo_root: &Path) -> Self {
        let canonical = std::fs::canonicalize(repo_root)
            .unwrap_or_else(|_| repo_root.to_path_buf());
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        let digest = hex::encode(&hasher.finalize()[..6]);
        Self {
            path: cache_dir.join("history").join(format!("{digest}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted index. Absent, unreadable-as-JSON, or
    /// schema-mismatched files all come back as `None` (a full replay
    /// rebuilds them); only an IO failure on an existing file is an error.
    pub async fn load(&self) -> ArgusResult<Option<LoadedIndex>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ArgusError::io(
                    format!("reading {}", self.path.display()),
                    e,
                ))
            }
        };
        let index: StoredIndex = match serde_json::from_slice(&bytes) {
            Ok(index) => index,
            Err(e) => {
                warn!("discarding corrupt history cache {}: {e}", self.path.display());
                return Ok(None);
            }
        };
        if index.schema != CACHE_SCHEMA {
            warn!(
                "discarding history cache {} with schema {} (want {})",
                self.path.display(),
                index.schema,
                CACHE_SCHEMA
            );
            return Ok(None);
        }
        Ok(Some(LoadedIndex {
            checkpoint: index.checkpoint,
            entries: index.entries,
        }))
    }

    /// Persist the index atomically. Entries are sorted before encoding so
    /// the same logical state always produces the same bytes.
    pub async fn write(&self, mut entries: Vec<StoredEntry>, checkpoint: &str) -> ArgusResult<()> {
        entries.sort_by(|a, b| {
            (&a.category, &a.name, &a.slot, &a.version, &a.keywords)
                .cmp(&(&b.category, &b.name, &b.slot, &b.version, &b.keywords))
        });
        let index = StoredIndex {
            schema: CACHE_SCHEMA,
            checkpoint: checkpoint.to_string(),
            entries,
        };
        let bytes = serde_json::to_vec(&index)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ArgusError::io(format!("creating {}", parent.display()), e))?;
        }
        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| ArgusError::io(format!("creating {}", tmp.display()), e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| ArgusError::io(format!("writing {}", tmp.display()), e))?;
        file.sync_all()
            .await
            .map_err(|e| ArgusError::io(format!("syncing {}", tmp.display()), e))?;
        drop(file);
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ArgusError::io(format!("renaming {}", tmp.display()), e))?;
        debug!("wrote history cache {}", self.path.display());
        Ok(())
    }

    /// Take the exclusive advisory lock for this store. Held until the
    /// returned guard is dropped; a second locker blocks rather than racing.
    pub async fn lock(&self) -> ArgusResult<StoreLock> {
        let lock_path = self.path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ArgusError::io(format!("creating {}", parent.display()), e))?;
        }
        let path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| ArgusError::Internal(format!("lock task failed: {e}")))?
        .map_err(|e| ArgusError::io(format!("locking {}", lock_path.display()), e))?;
        debug!("acquired history cache lock {}", lock_path.display());
        Ok(StoreLock { _file: file })
    }

    /// Delete the store file. Returns whether a persisted index existed.
    /// The advisory lock is taken first, so a refresh in flight finishes
    /// its load-replay-write cycle before the files go away.
    pub async fn remove(&self) -> ArgusResult<bool> {
        let _lock = self.lock().await?;
        let mut existed = false;
        for path in [self.path.clone(), self.path.with_extension("tmp")] {
            match fs::remove_file(&path).await {
                Ok(()) => existed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ArgusError::io(format!("removing {}", path.display()), e))
                }
            }
        }
        // The lock sibling exists because the acquisition above created it;
        // it says nothing about whether a cache was present.
        let lock_path = self.path.with_extension("lock");
        match fs::remove_file(&lock_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ArgusError::io(
                    format!("removing {}", lock_path.display()),
                    e,
                ))
            }
        }
        Ok(existed)
    }
}

/// Advisory lock guard; released on drop.
#[derive(Debug)]
pub struct StoreLock {
    _file: std::fs::File,
}
