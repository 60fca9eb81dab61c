//! Package version parsing and ordering
//!
//! Versions follow the grammar `N(.N)*[a-z]?(-rN)?`: dot-separated numeric
//! components, an optional single trailing letter, and an optional revision
//! suffix. `1.2 < 1.2a < 1.2b < 1.2b-r1 < 1.10`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ArgusError, ArgusResult};

/// A parsed package version.
///
/// Ordering compares numeric components positionally (missing components
/// count as zero), then the letter suffix, then the revision. The original
/// string is kept verbatim so two spellings of the same value (`1.0` vs
/// `1.00`) stay distinct and round-trip losslessly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    parts: Vec<u64>,
    letter: Option<char>,
    revision: u64,
    raw: String,
}

impl Version {
    /// Parse a version string.
    pub fn parse(input: &str) -> ArgusResult<Self> {
        let invalid = || ArgusError::InvalidVersion(input.to_string());

        // Split off an optional `-rN` revision suffix.
        let (main, revision) = match input.rsplit_once("-r") {
            Some((head, digits))
                if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
            {
                (head, digits.parse::<u64>().map_err(|_| invalid())?)
            }
            _ => (input, 0),
        };

        // Split off an optional single trailing letter.
        let (numeric, letter) = match main.chars().last() {
            Some(c) if c.is_ascii_lowercase() => (&main[..main.len() - 1], Some(c)),
            _ => (main, None),
        };

        if numeric.is_empty() {
            return Err(invalid());
        }
        let mut parts = Vec::new();
        for component in numeric.split('.') {
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            parts.push(component.parse::<u64>().map_err(|_| invalid())?);
        }

        Ok(Self {
            parts,
            letter,
            revision,
            raw: input.to_string(),
        })
    }

    /// The version exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }
        self.letter
            .cmp(&other.letter)
            .then(self.revision.cmp(&other.revision))
            // Tiebreak on the raw text so ordering agrees with equality.
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = ArgusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = ArgusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.raw
    }
}
