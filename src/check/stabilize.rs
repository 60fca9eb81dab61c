//! Stabilization-overdue check
//!
//! Flags the latest version of a slot lineage that is still unstable on
//! architectures where the lineage already went stable, once that version's
//! keyword set has sat in history past its waiting period.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::schema::StabilizeConfig;
use crate::error::ArgusResult;
use crate::history::HistoryCache;
use crate::pkg::{unstable_label, PackageId, Stability};
use crate::repo::PackageRecord;

use super::{AddonSet, Check, CheckInit, CheckKind, Finding, RunContext, Target};

/// Waiting periods per architecture group; configuration data, not logic.
#[derive(Debug, Clone)]
pub struct StabilizePolicy {
    stable_days: u32,
    extended_days: u32,
    extended_arches: BTreeSet<String>,
}

impl StabilizePolicy {
    pub fn from_config(config: &StabilizeConfig) -> Self {
        Self {
            stable_days: config.stable_days,
            extended_days: config.extended_days,
            extended_arches: config.extended_arches.iter().cloned().collect(),
        }
    }

    /// Days an unstable version must age before stabilization is due.
    pub fn threshold_days(&self, arch: &str) -> u32 {
        if self.extended_arches.contains(arch) {
            self.extended_days
        } else {
            self.stable_days
        }
    }
}

/// Latest version of a slot lineage stuck unstable past its window.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StabilizeDue {
    pub slot: String,
    /// Unstable labels due for stabilization, ascending by architecture.
    pub keywords: Vec<String>,
    /// Full days since this keyword set first appeared in history.
    pub age_days: i64,
    pub pkg: PackageId,
}

impl fmt::Display for StabilizeDue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slot({}) unstable for {} days: {}",
            self.slot,
            self.age_days,
            self.keywords.join(" ")
        )
    }
}

pub struct StabilizeCheck {
    policy: StabilizePolicy,
    today: NaiveDate,
    history: Arc<HistoryCache>,
}

impl StabilizeCheck {
    /// Preconditions: the target must be the reference tree the waiting
    /// periods were calibrated against, the history cache must be enabled,
    /// and the history addon must come up.
    pub(super) async fn init(ctx: &RunContext<'_>, addons: &AddonSet) -> ArgusResult<CheckInit> {
        let reference = &ctx.config.stabilize.reference_repo;
        if ctx.snapshot.name() != reference {
            return Ok(CheckInit::Skipped(format!(
                "not running against {reference} repo"
            )));
        }
        if !ctx.config.cache.enabled {
            return Ok(CheckInit::Skipped("history cache support required".into()));
        }
        match addons.history(ctx).await? {
            Ok(history) => Ok(CheckInit::Ready(Box::new(Self {
                policy: StabilizePolicy::from_config(&ctx.config.stabilize),
                today: ctx.today,
                history,
            }))),
            Err(reason) => Ok(CheckInit::Skipped(format!(
                "history cache unavailable: {reason}"
            ))),
        }
    }

    fn check_lineage(&self, lineage: &[&PackageRecord], findings: &mut Vec<Finding>) {
        let Some(latest) = lineage.last() else { return };

        // Architectures where any version of this lineage is stable today;
        // an architecture never stabilized has nothing overdue.
        let stable_arches: BTreeSet<&str> = lineage
            .iter()
            .flat_map(|record| record.keywords.stable_arches())
            .collect();
        if stable_arches.is_empty() {
            return;
        }

        // Age comes from the first appearance of the latest version's full
        // current keyword set. Unknown to the history means uncommitted
        // local state, which is not yet judgeable.
        let Some(origin) = self.history.lookup(&latest.id, &latest.keywords) else {
            return;
        };
        let age_days = (self.today - origin.timestamp.date_naive()).num_days().max(0);

        let mut due = Vec::new();
        for (arch, stability) in latest.keywords.arches() {
            if stability != Stability::Unstable || !stable_arches.contains(arch) {
                continue;
            }
            if age_days >= i64::from(self.policy.threshold_days(arch)) {
                due.push(unstable_label(arch));
            }
        }
        if !due.is_empty() {
            findings.push(Finding::Stabilize(StabilizeDue {
                slot: latest.id.slot.clone(),
                keywords: due,
                age_days,
                pkg: latest.id.clone(),
            }));
        }
    }
}

impl Check for StabilizeCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Stabilize
    }

    fn feed(&self, target: Target<'_>, findings: &mut Vec<Finding>) {
        let Target::Set(set) = target else { return };
        // One pass per slot lineage; set order is version-ascending, which
        // per-slot filtering preserves.
        let mut lineages: BTreeMap<&str, Vec<&PackageRecord>> = BTreeMap::new();
        for record in set {
            lineages
                .entry(record.id.slot.as_str())
                .or_default()
                .push(record);
        }
        for lineage in lineages.values() {
            self.check_lineage(lineage, findings);
        }
    }
}
