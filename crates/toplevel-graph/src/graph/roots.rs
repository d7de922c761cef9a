//! Top-level package detection on the condensed graph.
//!
//! A root is an SCC with no incoming edge. Each root is reported through one
//! seed package, the smallest by id; the remaining seed members are kept as
//! grouping detail ("`a` consists of (`a` `b`)").
//!
//! Roots whose representative has an always-present priority (by default
//! `required` and `important`) are *suppressed*: they are kept so the
//! recommendation tracer can attribute provenance to them, but they are not
//! reported as top-level.

#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeSet;

use serde::Serialize;
use toplevel_core::{PackageId, Priority};
use tracing::{debug, error, instrument};

use crate::error::AnalysisError;
use crate::graph::condense::Condensation;
use crate::seed::SeedSet;

/// One root SCC of the condensation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootComponent {
    /// Smallest seed member of the SCC.
    pub representative: PackageId,
    /// Every seed member of the SCC, sorted; starts with the representative.
    pub seed_members: Vec<PackageId>,
    pub priority: Priority,
    /// Not reported because the representative is always present anyway.
    pub suppressed: bool,
}

/// All root components of a condensation, sorted by representative.
#[derive(Debug, Clone, Default)]
pub struct TopLevel {
    roots: Vec<RootComponent>,
}

impl TopLevel {
    /// Find the roots of `condensation`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::RootWithoutSeed`] if a root SCC has no seed
    /// member, which only a builder or condenser bug can cause.
    #[instrument(skip_all, fields(sccs = condensation.scc_count()))]
    pub fn find(
        condensation: &Condensation,
        seed: &SeedSet,
        always_present: &[Priority],
    ) -> Result<Self, AnalysisError> {
        let mut roots = Vec::new();

        for idx in condensation.sources() {
            let members = &condensation.dag[idx].members;
            let seed_members: Vec<PackageId> =
                members.iter().filter(|id| seed.contains(id)).cloned().collect();

            let Some(representative) = seed_members.first().cloned() else {
                error!(?members, "root component without seed package");
                return Err(AnalysisError::RootWithoutSeed {
                    members: members.clone(),
                });
            };

            let priority = seed
                .get(&representative)
                .map_or(Priority::Unknown, |p| p.priority);

            roots.push(RootComponent {
                representative,
                seed_members,
                priority,
                suppressed: always_present.contains(&priority),
            });
        }

        roots.sort_by(|a, b| a.representative.cmp(&b.representative));
        debug!(
            roots = roots.len(),
            suppressed = roots.iter().filter(|r| r.suppressed).count(),
            "top-level components found"
        );
        Ok(Self { roots })
    }

    /// Every root, suppressed ones included.
    #[must_use]
    pub fn roots(&self) -> &[RootComponent] {
        &self.roots
    }

    /// Roots to report as top-level packages.
    pub fn reported(&self) -> impl Iterator<Item = &RootComponent> {
        self.roots.iter().filter(|r| !r.suppressed)
    }

    /// Representatives of every root, suppressed ones included.
    #[must_use]
    pub fn representatives(&self) -> BTreeSet<PackageId> {
        self.roots.iter().map(|r| r.representative.clone()).collect()
    }
}
