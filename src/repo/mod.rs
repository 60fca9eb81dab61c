//! Package tree snapshot reader
//!
//! Loads the current working-tree state of a package tree: every manifest,
//! parsed and sorted, grouped into per-package sets for the check runner.

pub mod manifest;

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{ArgusError, ArgusResult};
use crate::pkg::{KeywordSet, PackageId};

pub use manifest::Manifest;

/// `repo.toml` at the tree root.
#[derive(Debug, Deserialize)]
struct TreeMeta {
    name: String,
}

/// One package version as present in the working tree.
#[derive(Debug, Clone)]
pub struct PackageRecord {
    pub id: PackageId,
    pub keywords: KeywordSet,
    pub inherit: Vec<String>,
}

/// Immutable view of a package tree's working state.
///
/// Records are sorted by (category, name, version); `set()` exposes the
/// contiguous run of versions belonging to one `category/name`.
#[derive(Debug)]
pub struct Snapshot {
    root: PathBuf,
    name: String,
    packages: Vec<PackageRecord>,
    sets: Vec<Range<usize>>,
}

impl Snapshot {
    /// Read the tree rooted at `root`. Individual broken manifests are
    /// logged and skipped; a missing `repo.toml` is fatal.
    pub fn load(root: &Path) -> ArgusResult<Self> {
        let root = fs::canonicalize(root)
            .map_err(|_| ArgusError::PathNotFound(root.to_path_buf()))?;
        let meta_path = root.join("repo.toml");
        let meta_raw = match fs::read_to_string(&meta_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArgusError::NotAPackageTree(root));
            }
            Err(e) => return Err(ArgusError::io(format!("reading {}", meta_path.display()), e)),
        };
        let meta: TreeMeta = toml::from_str(&meta_raw).map_err(|e| ArgusError::ConfigInvalid {
            path: meta_path.clone(),
            reason: e.to_string(),
        })?;

        let mut packages = Vec::new();
        // The prune below is never consulted for entries shallower than
        // min_depth, so start at 1 to catch top-level dot directories like
        // .git; the root stays exempt since a tree may live under a
        // dot-named directory.
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(3)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.file_name()));
        for entry in walker {
            let entry = entry.map_err(|e| {
                ArgusError::io(format!("walking {}", root.display()), e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(manifest::MANIFEST_EXT) {
                continue;
            }
            let rel = match path.strip_prefix(&root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let Some((category, name, version)) = manifest::ident_from_path(rel) else {
                warn!("skipping misplaced manifest: {}", rel.display());
                continue;
            };
            let content = fs::read_to_string(path)
                .map_err(|e| ArgusError::io(format!("reading {}", path.display()), e))?;
            let body = match manifest::parse(&content, rel) {
                Ok(body) => body,
                Err(e) => {
                    warn!("skipping broken manifest: {e}");
                    continue;
                }
            };
            packages.push(PackageRecord {
                id: PackageId::new(category, name, body.slot, version),
                keywords: KeywordSet::from_labels(&body.keywords),
                inherit: body.inherit,
            });
        }

        packages.sort_by(|a, b| {
            (&a.id.category, &a.id.name, &a.id.version)
                .cmp(&(&b.id.category, &b.id.name, &b.id.version))
        });
        let sets = set_ranges(&packages);
        debug!(
            packages = packages.len(),
            sets = sets.len(),
            "loaded package tree '{}'",
            meta.name
        );

        Ok(Self {
            root,
            name: meta.name,
            packages,
            sets,
        })
    }

    /// Canonicalized tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Tree name from `repo.toml`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All records, sorted by (category, name, version).
    pub fn packages(&self) -> &[PackageRecord] {
        &self.packages
    }

    /// Number of `category/name` sets.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// All versions of the i-th `category/name`, ascending by version.
    pub fn set(&self, i: usize) -> &[PackageRecord] {
        &self.packages[self.sets[i].clone()]
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

fn set_ranges(packages: &[PackageRecord]) -> Vec<Range<usize>> {
    let mut sets = Vec::new();
    let mut start = 0;
    for i in 1..=packages.len() {
        let boundary = i == packages.len() || {
            let (a, b) = (&packages[i - 1].id, &packages[i].id);
            (&a.category, &a.name) != (&b.category, &b.name)
        };
        if boundary && i > start {
            sets.push(start..i);
            start = i;
        }
    }
    sets
}
