//! Per-architecture stability markers
//!
//! A manifest labels each architecture with exactly one marker: `arch`
//! (stable), `~arch` (unstable), or nothing at all. `-arch` labels mean the
//! architecture is explicitly unsupported and carry no marker here.

use std::collections::BTreeMap;
use std::fmt;

/// Stability of a package version on one architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stability {
    Unstable,
    Stable,
}

/// Immutable set of per-architecture stability markers.
///
/// Architectures absent from the set carry no marker. Iteration order is
/// always ascending by architecture name, so derived output (labels, hashes,
/// persisted entries) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeywordSet {
    markers: BTreeMap<String, Stability>,
}

impl KeywordSet {
    /// Build a set from manifest labels. `-arch` labels and empty strings are
    /// dropped; if an architecture appears twice the last label wins.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut markers = BTreeMap::new();
        for label in labels {
            let label = label.as_ref().trim();
            match label.as_bytes().first() {
                None | Some(b'-') => {}
                Some(b'~') => {
                    let arch = &label[1..];
                    if !arch.is_empty() {
                        markers.insert(arch.to_string(), Stability::Unstable);
                    }
                }
                Some(_) => {
                    markers.insert(label.to_string(), Stability::Stable);
                }
            }
        }
        Self { markers }
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Marker for one architecture, if any.
    pub fn get(&self, arch: &str) -> Option<Stability> {
        self.markers.get(arch).copied()
    }

    /// All (architecture, marker) pairs, ascending by architecture.
    pub fn arches(&self) -> impl Iterator<Item = (&str, Stability)> {
        self.markers.iter().map(|(arch, st)| (arch.as_str(), *st))
    }

    /// Architectures marked stable, ascending.
    pub fn stable_arches(&self) -> impl Iterator<Item = &str> {
        self.markers
            .iter()
            .filter(|(_, st)| **st == Stability::Stable)
            .map(|(arch, _)| arch.as_str())
    }

    /// Canonical labels (`arch` / `~arch`), ascending by architecture.
    pub fn labels(&self) -> Vec<String> {
        self.markers
            .iter()
            .map(|(arch, st)| match st {
                Stability::Stable => arch.clone(),
                Stability::Unstable => unstable_label(arch),
            })
            .collect()
    }
}

impl fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.labels().join(" "))
    }
}

/// The `~arch` spelling of an unstable marker.
pub fn unstable_label(arch: &str) -> String {
    format!("~{arch}")
}
