//! Package identity model
//!
//! Packages are addressed as `category/name-version`; the slot partitions a
//! package's versions into independently installable lineages.

pub mod keywords;
pub mod version;

use std::fmt;

use serde::Serialize;

pub use keywords::{unstable_label, KeywordSet, Stability};
pub use version::Version;

/// Fully qualified identity of one package version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageId {
    pub category: String,
    pub name: String,
    pub slot: String,
    pub version: Version,
}

impl PackageId {
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        slot: impl Into<String>,
        version: Version,
    ) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            slot: slot.into(),
            version,
        }
    }

    /// `category/name` without the version.
    pub fn package(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.category, self.name, self.version)
    }
}
