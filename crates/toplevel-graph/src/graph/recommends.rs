//! Missing-recommends tracing.
//!
//! A *missing recommend* is a package that something in the analyzed set
//! recommends, that is not itself in the seed set, and that no hard
//! dependency (`Depends`/`Pre-Depends`) edge anywhere in the graph points
//! at. For each one the tracer reports:
//!
//! - `via`: the packages with a direct `Recommends` edge to it;
//! - `by`: the top-level packages it is reachable from, minus `via`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use toplevel_core::{DependencyKind, PackageId};
use tracing::{debug, instrument};

use crate::graph::build::DependencyGraph;
use crate::seed::SeedSet;

/// Who is responsible for a missing recommend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Direct recommenders.
    pub via: BTreeSet<PackageId>,
    /// Top-level packages reaching the recommend indirectly.
    pub by: BTreeSet<PackageId>,
}

/// Find the missing recommends of `graph`, keyed by recommended package.
#[must_use]
#[instrument(skip_all, fields(edges = graph.edge_count()))]
pub fn trace_missing_recommends(
    graph: &DependencyGraph,
    seed: &SeedSet,
    top_level: &BTreeSet<PackageId>,
) -> BTreeMap<PackageId, Provenance> {
    let mut candidates: BTreeMap<PackageId, Provenance> = BTreeMap::new();
    for (source, target, kind) in graph.edges() {
        if kind == DependencyKind::Recommends && !seed.contains(target) {
            candidates
                .entry(target.clone())
                .or_default()
                .via
                .insert(source.clone());
        }
    }

    for (_, target, kind) in graph.edges() {
        if kind.is_hard() {
            candidates.remove(target);
        }
    }

    for (target, provenance) in &mut candidates {
        provenance.by = graph
            .ancestors(target)
            .intersection(top_level)
            .filter(|id| !provenance.via.contains(*id))
            .cloned()
            .collect();
    }

    debug!(missing = candidates.len(), "missing recommends traced");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::BuildOptions;
    use crate::testutil::{db, id, pkg, with_group};
    use toplevel_core::Package;

    fn trace(
        packages: Vec<Package>,
        seed: &[&str],
        top: &[&str],
        follow: bool,
    ) -> BTreeMap<PackageId, Provenance> {
        let db = db(packages);
        let names: Vec<String> = seed.iter().map(ToString::to_string).collect();
        let seed = SeedSet::resolve(&db, &names).expect("seed");
        let options = BuildOptions {
            follow_unspecified: follow,
            use_recommends: true,
        };
        let graph = DependencyGraph::build(&db, &seed, options);
        let top: BTreeSet<PackageId> = top.iter().map(|n| id(n)).collect();
        trace_missing_recommends(&graph, &seed, &top)
    }

    #[test]
    fn seed_recommends_are_not_missing() {
        let missing = trace(
            vec![with_group(pkg("a"), DependencyKind::Recommends, &["b"]), pkg("b")],
            &["a", "b"],
            &["a"],
            false,
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn direct_recommender_is_via_not_by() {
        let missing = trace(
            vec![with_group(pkg("a"), DependencyKind::Recommends, &["x"]), pkg("x")],
            &["a"],
            &["a"],
            false,
        );
        let provenance = &missing[&id("x")];
        assert_eq!(provenance.via, BTreeSet::from([id("a")]));
        assert!(provenance.by.is_empty());
    }

    #[test]
    fn indirect_top_level_is_by() {
        // top → lib (Depends), lib → x (Recommends)
        let missing = trace(
            vec![
                with_group(pkg("top"), DependencyKind::Depends, &["lib"]),
                with_group(pkg("lib"), DependencyKind::Recommends, &["x"]),
                pkg("x"),
            ],
            &["top", "lib"],
            &["top"],
            false,
        );
        let provenance = &missing[&id("x")];
        assert_eq!(provenance.via, BTreeSet::from([id("lib")]));
        assert_eq!(provenance.by, BTreeSet::from([id("top")]));
    }

    #[test]
    fn hard_dependency_anywhere_discards_candidate() {
        let missing = trace(
            vec![
                with_group(pkg("a"), DependencyKind::Recommends, &["x"]),
                with_group(pkg("b"), DependencyKind::PreDepends, &["x"]),
                pkg("x"),
            ],
            &["a", "b"],
            &["a", "b"],
            false,
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn unresolvable_recommends_never_appear() {
        let missing = trace(
            vec![with_group(pkg("a"), DependencyKind::Recommends, &["ghost"])],
            &["a"],
            &["a"],
            false,
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn via_and_by_never_overlap() {
        // a recommends x directly and also reaches it through b.
        let missing = trace(
            vec![
                with_group(
                    with_group(pkg("a"), DependencyKind::Recommends, &["x"]),
                    DependencyKind::Depends,
                    &["b"],
                ),
                with_group(pkg("b"), DependencyKind::Recommends, &["x"]),
                pkg("x"),
            ],
            &["a", "b"],
            &["a"],
            false,
        );
        let provenance = &missing[&id("x")];
        assert_eq!(provenance.via, BTreeSet::from([id("a"), id("b")]));
        assert!(provenance.by.is_disjoint(&provenance.via));
        assert!(provenance.by.is_empty());
    }
}
