//! Dependency graph construction from a seed set.
//!
//! # Overview
//!
//! Starting at the seed packages, each package's relationship groups are
//! resolved through a [`Resolver`] and turned into labeled edges
//! `dependent → dependency`. The result is a multigraph: the same pair of
//! packages may be connected once per [`DependencyKind`].
//!
//! ## OR groups
//!
//! A group such as `default-mta | mail-transport-agent` is satisfied by any
//! one alternative, but which one is only known at install time. If an
//! alternative is a seed package it is taken as the answer and gets the only
//! edge of the group. Otherwise every resolvable alternative gets an edge.
//! Over-approximating reachability here can only hide a root behind an edge
//! that does not exist in practice; under-approximating would invent roots.
//!
//! ## Virtual names
//!
//! An alternative naming no concrete package is looked up among the virtual
//! names provided by seed packages, then among installed providers known to
//! the resolver. Unresolvable alternatives are skipped.
//!
//! ## Traversal
//!
//! An explicit stack and a visited set keyed by [`PackageId`] guarantee each
//! package is expanded once, cycles included. Without
//! [`BuildOptions::follow_unspecified`] only seed packages are expanded;
//! packages discovered through them become leaf nodes.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef, Reversed, Walker};
use toplevel_core::{DependencyGroup, DependencyKind, Package, PackageId, Resolver};
use tracing::{debug, instrument, trace};

use crate::seed::SeedSet;

// ---------------------------------------------------------------------------
// BuildOptions
// ---------------------------------------------------------------------------

/// Knobs for [`DependencyGraph::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Expand packages discovered outside the seed set too.
    pub follow_unspecified: bool,
    /// Turn `Recommends` groups into edges.
    pub use_recommends: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            follow_unspecified: false,
            use_recommends: true,
        }
    }
}

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

/// A directed, edge-labeled package dependency graph.
///
/// Nodes are package ids; an edge `A → B` labeled `k` means "A has a `k`
/// relation satisfied by B". Cycles are common (e.g. `libc6 ↔ libgcc-s1`)
/// and preserved; see [`crate::graph::condense`] to collapse them.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Directed multigraph: nodes = package ids, edges = relation kinds.
    pub graph: DiGraph<PackageId, DependencyKind>,
    /// Mapping from package id to petgraph `NodeIndex`.
    pub node_map: HashMap<PackageId, NodeIndex>,
    /// Snapshot of every package that became a node.
    packages: BTreeMap<PackageId, Package>,
}

impl DependencyGraph {
    /// Build the graph for `seed`.
    #[must_use]
    #[instrument(skip(resolver, seed), fields(seeds = seed.len()))]
    pub fn build<R: Resolver + ?Sized>(
        resolver: &R,
        seed: &SeedSet,
        options: BuildOptions,
    ) -> Self {
        let mut graph = Self::default();
        // Reversed so that pops come out in ascending id order.
        let mut stack: Vec<Package> = seed.iter().rev().cloned().collect();
        let mut visited: HashSet<PackageId> = HashSet::with_capacity(seed.len());

        while let Some(package) = stack.pop() {
            if !visited.insert(package.id.clone()) {
                continue;
            }
            let source = graph.add_node(&package);

            for group in package.dependency_groups(options.use_recommends) {
                for target in resolve_group(resolver, seed, &package, group) {
                    let target_idx = graph.add_node(&target);
                    graph.add_edge(source, target_idx, group.kind);

                    if options.follow_unspecified && !visited.contains(&target.id) {
                        stack.push(target);
                    }
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            expanded = visited.len(),
            "dependency graph built"
        );
        graph
    }

    fn add_node(&mut self, package: &Package) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&package.id) {
            return idx;
        }
        let idx = self.graph.add_node(package.id.clone());
        self.node_map.insert(package.id.clone(), idx);
        self.packages.insert(package.id.clone(), package.clone());
        idx
    }

    /// Add `source → target` labeled `kind` unless that exact triple exists.
    fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, kind: DependencyKind) {
        let exists = self
            .graph
            .edges_connecting(source, target)
            .any(|edge| *edge.weight() == kind);
        if !exists {
            self.graph.add_edge(source, target, kind);
        }
    }

    /// Return the number of nodes (packages) in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of labeled edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up the `NodeIndex` for a package id.
    #[must_use]
    pub fn node_index(&self, id: &PackageId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    /// Package snapshot for a node.
    #[must_use]
    pub fn package(&self, id: &PackageId) -> Option<&Package> {
        self.packages.get(id)
    }

    /// All edges as `(source, target, kind)`.
    pub fn edges(&self) -> impl Iterator<Item = (&PackageId, &PackageId, DependencyKind)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], *e.weight()))
    }

    /// Kinds of the edges from `source` to `target`, sorted.
    #[must_use]
    pub fn edge_kinds(&self, source: &PackageId, target: &PackageId) -> Vec<DependencyKind> {
        let (Some(a), Some(b)) = (self.node_index(source), self.node_index(target)) else {
            return Vec::new();
        };
        let mut kinds: Vec<DependencyKind> =
            self.graph.edges_connecting(a, b).map(|e| *e.weight()).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Every package with a path to `id`, excluding `id` itself.
    #[must_use]
    pub fn ancestors(&self, id: &PackageId) -> BTreeSet<PackageId> {
        let Some(start) = self.node_index(id) else {
            return BTreeSet::new();
        };
        let reversed = Reversed(&self.graph);
        Bfs::new(reversed, start)
            .iter(reversed)
            .filter(|&idx| idx != start)
            .map(|idx| self.graph[idx].clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Resolve one OR group to the packages that get an edge.
fn resolve_group<R: Resolver + ?Sized>(
    resolver: &R,
    seed: &SeedSet,
    owner: &Package,
    group: &DependencyGroup,
) -> Vec<Package> {
    let mut resolved = Vec::with_capacity(group.alternatives.len());
    for alternative in &group.alternatives {
        let arch = alternative.arch.resolve(owner.arch(), resolver.native_arch());
        let Some(package) = resolve_alternative(resolver, seed, &alternative.name, arch) else {
            trace!(owner = %owner.id, name = %alternative.name, arch, "unresolved alternative");
            continue;
        };

        if seed.contains(&package.id) {
            return vec![package];
        }
        resolved.push(package);
    }
    resolved
}

fn resolve_alternative<R: Resolver + ?Sized>(
    resolver: &R,
    seed: &SeedSet,
    name: &str,
    arch: &str,
) -> Option<Package> {
    resolver
        .resolve(name, arch)
        .or_else(|| seed.provider(name, arch).cloned())
        .or_else(|| resolver.providers(name, arch).into_iter().next())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{db, id, pkg, with_group};
    use toplevel_core::{Alternative, ArchQualifier};

    fn seed_of(db: &toplevel_core::Database, names: &[&str]) -> SeedSet {
        let names: Vec<String> = names.iter().map(ToString::to_string).collect();
        SeedSet::resolve(db, &names).expect("seed")
    }

    #[test]
    fn seeds_without_dependencies_are_nodes_only() {
        let db = db([pkg("a"), pkg("b")]);
        let graph =
            DependencyGraph::build(&db, &seed_of(&db, &["a", "b"]), BuildOptions::default());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn single_edge_direction() {
        let db = db([with_group(pkg("a"), DependencyKind::Depends, &["b"]), pkg("b")]);
        let graph = DependencyGraph::build(&db, &seed_of(&db, &["a"]), BuildOptions::default());

        assert_eq!(graph.edge_kinds(&id("a"), &id("b")), vec![DependencyKind::Depends]);
        assert!(graph.edge_kinds(&id("b"), &id("a")).is_empty(), "no reverse edge");
    }

    #[test]
    fn unresolvable_alternatives_are_skipped() {
        let db = db([with_group(pkg("a"), DependencyKind::Depends, &["ghost"])]);
        let graph = DependencyGraph::build(&db, &seed_of(&db, &["a"]), BuildOptions::default());
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn or_group_prefers_seed_alternative() {
        let db = db([
            with_group(pkg("a"), DependencyKind::Depends, &["x", "y", "z"]),
            pkg("x"),
            pkg("y"),
            pkg("z"),
        ]);
        let graph =
            DependencyGraph::build(&db, &seed_of(&db, &["a", "y"]), BuildOptions::default());

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_kinds(&id("a"), &id("y")), vec![DependencyKind::Depends]);
        assert!(graph.node_index(&id("x")).is_none());
    }

    #[test]
    fn or_group_without_seed_branches_everywhere() {
        let db = db([
            with_group(pkg("a"), DependencyKind::Depends, &["x", "ghost", "z"]),
            pkg("x"),
            pkg("z"),
        ]);
        let graph = DependencyGraph::build(&db, &seed_of(&db, &["a"]), BuildOptions::default());

        assert_eq!(graph.edge_count(), 2);
        assert!(!graph.edge_kinds(&id("a"), &id("x")).is_empty());
        assert!(!graph.edge_kinds(&id("a"), &id("z")).is_empty());
    }

    #[test]
    fn distinct_kinds_are_kept_and_duplicates_dropped() {
        let a = with_group(pkg("a"), DependencyKind::PreDepends, &["b"]);
        let a = with_group(a, DependencyKind::Depends, &["b"]);
        let a = with_group(a, DependencyKind::Depends, &["b"]);
        let a = with_group(a, DependencyKind::Recommends, &["b"]);
        let db = db([a, pkg("b")]);

        let graph = DependencyGraph::build(&db, &seed_of(&db, &["a"]), BuildOptions::default());
        assert_eq!(
            graph.edge_kinds(&id("a"), &id("b")),
            vec![
                DependencyKind::Depends,
                DependencyKind::PreDepends,
                DependencyKind::Recommends
            ]
        );
    }

    #[test]
    fn recommends_can_be_disabled() {
        let db = db([with_group(pkg("a"), DependencyKind::Recommends, &["b"]), pkg("b")]);
        let options = BuildOptions {
            use_recommends: false,
            ..BuildOptions::default()
        };
        let graph = DependencyGraph::build(&db, &seed_of(&db, &["a"]), options);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn discovered_packages_expand_only_when_following() {
        let db = db([
            with_group(pkg("a"), DependencyKind::Depends, &["b"]),
            with_group(pkg("b"), DependencyKind::Depends, &["c"]),
            pkg("c"),
        ]);
        let seed = seed_of(&db, &["a"]);

        let shallow = DependencyGraph::build(&db, &seed, BuildOptions::default());
        assert_eq!(shallow.node_count(), 2, "b is a leaf");

        let options = BuildOptions {
            follow_unspecified: true,
            ..BuildOptions::default()
        };
        let deep = DependencyGraph::build(&db, &seed, options);
        assert_eq!(deep.node_count(), 3);
        assert!(!deep.edge_kinds(&id("b"), &id("c")).is_empty());
    }

    #[test]
    fn cycles_terminate() {
        let db = db([
            with_group(pkg("a"), DependencyKind::Depends, &["b"]),
            with_group(pkg("b"), DependencyKind::Depends, &["a"]),
        ]);
        let options = BuildOptions {
            follow_unspecified: true,
            ..BuildOptions::default()
        };
        let graph = DependencyGraph::build(&db, &seed_of(&db, &["a"]), options);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn virtual_names_resolve_through_seed_providers_first() {
        let mut exim = pkg("exim4");
        exim.provides.insert("mail-transport-agent".to_string());
        let mut postfix = pkg("postfix");
        postfix.provides.insert("mail-transport-agent".to_string());
        let db = db([
            with_group(pkg("mutt"), DependencyKind::Depends, &["mail-transport-agent"]),
            exim,
            postfix,
        ]);

        let seed = seed_of(&db, &["mutt", "postfix"]);
        let graph = DependencyGraph::build(&db, &seed, BuildOptions::default());
        assert!(!graph.edge_kinds(&id("mutt"), &id("postfix")).is_empty());
        assert!(graph.node_index(&id("exim4")).is_none());

        let graph = DependencyGraph::build(&db, &seed_of(&db, &["mutt"]), BuildOptions::default());
        assert!(
            !graph.edge_kinds(&id("mutt"), &id("exim4")).is_empty(),
            "falls back to the first installed provider"
        );
    }

    #[test]
    fn foreign_packages_reach_arch_all_virtual_providers() {
        let mut tool = with_group(pkg("tool"), DependencyKind::Depends, &["debconf-2.0"]);
        tool.id.arch = "i386".to_string();
        let mut debconf = pkg("debconf");
        debconf.id.arch = "all".to_string();
        debconf.provides.insert("debconf-2.0".to_string());
        let db = db([tool, debconf]);
        let tool_id = PackageId::new("tool", "i386");

        let seed = seed_of(&db, &["tool:i386", "debconf"]);
        let graph = DependencyGraph::build(&db, &seed, BuildOptions::default());
        assert!(!graph.edge_kinds(&tool_id, &id("debconf")).is_empty());

        let seed = seed_of(&db, &["tool:i386"]);
        let graph = DependencyGraph::build(&db, &seed, BuildOptions::default());
        assert!(
            !graph.edge_kinds(&tool_id, &id("debconf")).is_empty(),
            "installed provider outside the seed set"
        );
    }

    #[test]
    fn arch_qualifiers_pick_the_lookup_arch() {
        let mut owner = pkg("tool");
        owner.dependencies.push(DependencyGroup::new(
            DependencyKind::Depends,
            vec![Alternative::new("libfoo").with_arch(ArchQualifier::Exact("i386".to_string()))],
        ));
        let mut foreign = pkg("libfoo");
        foreign.id.arch = "i386".to_string();
        let db = db([owner, foreign, pkg("libfoo")]);

        let graph = DependencyGraph::build(&db, &seed_of(&db, &["tool"]), BuildOptions::default());
        assert!(!graph
            .edge_kinds(&id("tool"), &PackageId::new("libfoo", "i386"))
            .is_empty());
        assert!(graph.node_index(&id("libfoo")).is_none());
    }

    #[test]
    fn ancestors_follow_edges_backwards() {
        let db = db([
            with_group(pkg("a"), DependencyKind::Depends, &["b"]),
            with_group(pkg("b"), DependencyKind::Recommends, &["c"]),
            pkg("c"),
            pkg("d"),
        ]);
        let seed = seed_of(&db, &["a", "b", "d"]);
        let graph = DependencyGraph::build(&db, &seed, BuildOptions::default());

        let ancestors: Vec<String> =
            graph.ancestors(&id("c")).into_iter().map(|i| i.name).collect();
        assert_eq!(ancestors, vec!["a", "b"]);
        assert!(graph.ancestors(&id("a")).is_empty());
        assert!(graph.ancestors(&id("nope")).is_empty());
    }
}
