//! Package manifest parsing
//!
//! A manifest lives at `<category>/<name>/<name>-<version>.pkg` and is a
//! small TOML document describing one package version.

use std::path::{Component, Path};

use serde::Deserialize;

use crate::error::{ArgusError, ArgusResult};
use crate::pkg::Version;

/// File extension of package manifests.
pub const MANIFEST_EXT: &str = "pkg";

fn default_slot() -> String {
    "0".to_string()
}

/// Raw manifest body as written in a `.pkg` file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub slot: String,
    pub keywords: Vec<String>,
    pub inherit: Vec<String>,
    pub description: Option<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            slot: default_slot(),
            keywords: Vec::new(),
            inherit: Vec::new(),
            description: None,
        }
    }
}

/// Parse manifest TOML. `path` is only used for error context.
pub fn parse(content: &str, path: &Path) -> ArgusResult<Manifest> {
    toml::from_str(content).map_err(|e| ArgusError::Manifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Derive (category, name, version) from a manifest path relative to the
/// tree root. Returns `None` for paths that are not well-formed manifest
/// locations: files outside the two-level layout, filenames that do not
/// start with the package name, or hidden (dot-prefixed) components.
pub fn ident_from_path(rel: &Path) -> Option<(String, String, Version)> {
    let mut parts = rel.components().filter_map(|c| match c {
        Component::Normal(os) => os.to_str(),
        _ => None,
    });
    let category = parts.next()?;
    let name = parts.next()?;
    let file = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if [category, name, file].iter().any(|part| part.starts_with('.')) {
        return None;
    }

    let stem = file.strip_suffix(&format!(".{MANIFEST_EXT}"))?;
    let version = stem.strip_prefix(&format!("{name}-"))?;
    let version = Version::parse(version).ok()?;
    Some((category.to_string(), name.to_string(), version))
}
