//! SCC condensation of the dependency graph.
//!
//! # Overview
//!
//! Package graphs are full of cycles (`libc6 ↔ libgcc-s1`, `perl ↔
//! perl-modules`). "Top-level" means zero in-degree, which only has a
//! useful meaning on a DAG: every member of a cycle has an incoming edge.
//! Collapsing each strongly connected component (SCC) into one node yields
//! a DAG whose sources are exactly the groups nothing else depends on.
//!
//! Edge labels are dropped here. Label-aware questions (recommends vs. hard
//! dependencies) are answered against the uncondensed [`DependencyGraph`].

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use petgraph::{
    Direction,
    algo::condensation,
    graph::{DiGraph, NodeIndex},
    visit::IntoNodeIdentifiers,
};
use toplevel_core::PackageId;
use tracing::{debug, instrument};

use crate::graph::build::DependencyGraph;

// ---------------------------------------------------------------------------
// Condensation
// ---------------------------------------------------------------------------

/// A node in the condensed graph: one SCC of the dependency graph.
///
/// Most nodes hold a single package; nodes with several members are
/// dependency cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SccNode {
    /// Package ids in this SCC (sorted for deterministic output).
    pub members: Vec<PackageId>,
}

impl SccNode {
    /// Return `true` if this SCC contains more than one package.
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        self.members.len() > 1
    }
}

/// The condensed dependency DAG and the package → SCC membership map.
#[derive(Debug, Clone)]
pub struct Condensation {
    /// Condensed DAG: SCCs collapsed to single nodes, no self-loops, no
    /// parallel edges.
    pub dag: DiGraph<SccNode, ()>,
    /// Mapping from package id to its SCC node.
    pub membership: HashMap<PackageId, NodeIndex>,
}

impl Condensation {
    /// Condense `graph`.
    ///
    /// Runs petgraph's SCC condensation (Tarjan's algorithm internally) with
    /// `make_acyclic`, which drops intra-SCC edges and merges parallel ones.
    #[must_use]
    #[instrument(skip(graph), fields(nodes = graph.node_count()))]
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let unlabeled: DiGraph<PackageId, ()> = graph.graph.map(|_, id| id.clone(), |_, _| ());
        let condensed_raw: DiGraph<Vec<PackageId>, ()> =
            condensation(unlabeled, /* make_acyclic */ true);

        let dag: DiGraph<SccNode, ()> = condensed_raw.map(
            |_, members| {
                let mut sorted = members.clone();
                sorted.sort_unstable();
                SccNode { members: sorted }
            },
            |_, _| (),
        );

        let membership = build_membership_map(&dag);
        let condensed = Self { dag, membership };
        debug!(
            sccs = condensed.scc_count(),
            cycles = condensed.cycle_count(),
            "graph condensed"
        );
        condensed
    }

    /// Return the number of SCCs in the condensed graph.
    #[must_use]
    pub fn scc_count(&self) -> usize {
        self.dag.node_count()
    }

    /// Return the number of cycle SCCs (SCCs with more than one member).
    #[must_use]
    pub fn cycle_count(&self) -> usize {
        self.dag.node_weights().filter(|n| n.is_cycle()).count()
    }

    /// Return the SCC node index for a package.
    #[must_use]
    pub fn scc_of(&self, id: &PackageId) -> Option<NodeIndex> {
        self.membership.get(id).copied()
    }

    /// SCC nodes with no incoming edge, in index order.
    #[must_use]
    pub fn sources(&self) -> Vec<NodeIndex> {
        self.dag
            .node_identifiers()
            .filter(|&idx| {
                self.dag
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn build_membership_map(dag: &DiGraph<SccNode, ()>) -> HashMap<PackageId, NodeIndex> {
    let mut map = HashMap::new();
    for idx in dag.node_identifiers() {
        for member in &dag[idx].members {
            map.insert(member.clone(), idx);
        }
    }
    map
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
