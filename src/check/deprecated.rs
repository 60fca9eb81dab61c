//! Deprecated build-helper inheritance check
//!
//! Flags package versions that inherit helpers listed as deprecated in the
//! configuration, naming the replacement where one exists.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::pkg::PackageId;
use crate::repo::PackageRecord;

use super::{Check, CheckInit, CheckKind, Finding, RunContext, Target};

/// Package version inheriting one or more deprecated helpers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DeprecatedInherit {
    pub pkg: PackageId,
    /// (deprecated helper, replacement) pairs, ascending by helper name.
    pub inherits: Vec<(String, Option<String>)>,
}

impl fmt::Display for DeprecatedInherit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .inherits
            .iter()
            .map(|(name, replacement)| match replacement {
                Some(new) => format!("{name} (use {new})"),
                None => name.clone(),
            })
            .collect();
        write!(f, "inherits deprecated helpers: {}", rendered.join(", "))
    }
}

pub struct DeprecatedInheritCheck {
    /// Deprecated helper mapped to its replacement, if any.
    table: BTreeMap<String, Option<String>>,
}

impl DeprecatedInheritCheck {
    pub(super) fn init(ctx: &RunContext<'_>) -> CheckInit {
        let table = ctx
            .config
            .deprecated
            .inherits
            .iter()
            .map(|(name, replacement)| {
                let replacement = (!replacement.is_empty()).then(|| replacement.clone());
                (name.clone(), replacement)
            })
            .collect();
        CheckInit::Ready(Box::new(Self { table }))
    }

    fn deprecated_in(&self, record: &PackageRecord) -> Vec<(String, Option<String>)> {
        let mut matched: Vec<_> = record
            .inherit
            .iter()
            .filter_map(|name| {
                self.table
                    .get(name)
                    .map(|replacement| (name.clone(), replacement.clone()))
            })
            .collect();
        matched.sort();
        matched.dedup();
        matched
    }
}

impl Check for DeprecatedInheritCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::DeprecatedInherit
    }

    fn feed(&self, target: Target<'_>, findings: &mut Vec<Finding>) {
        let Target::Version(record) = target else { return };
        let inherits = self.deprecated_in(record);
        if !inherits.is_empty() {
            findings.push(Finding::DeprecatedInherit(DeprecatedInherit {
                pkg: record.id.clone(),
                inherits,
            }));
        }
    }
}
