//! End-to-end analysis: seed names in, sorted report out.

use serde::Serialize;
use toplevel_core::{PackageId, Priority, Resolver};
use tracing::{info, instrument};

use crate::error::AnalysisError;
use crate::graph::{
    BuildOptions, Condensation, DependencyGraph, TopLevel, trace_missing_recommends,
};
use crate::seed::SeedSet;

/// Everything that shapes one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub build: BuildOptions,
    pub show_missing_recommends: bool,
    /// With no names given, seed from manually installed packages only.
    pub manual_only: bool,
    /// Priorities whose roots are not reported as top-level.
    pub always_present: Vec<Priority>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            build: BuildOptions::default(),
            show_missing_recommends: false,
            manual_only: false,
            always_present: Priority::ALWAYS_PRESENT.to_vec(),
        }
    }
}

/// A reported top-level package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopLevelEntry {
    pub name: String,
    /// Seed packages sharing the root SCC, the entry itself first.
    pub members: Vec<String>,
}

/// A recommended package that is neither seeded nor hard-required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRecommend {
    pub name: String,
    pub via: Vec<String>,
    pub by: Vec<String>,
}

/// Size of the analyzed graph, for logs and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub seeds: usize,
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,
    pub cycles: usize,
    pub suppressed_roots: usize,
}

/// Result of one analysis run. Every list is sorted by package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub top_level: Vec<TopLevelEntry>,
    /// `None` unless missing recommends were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_recommends: Option<Vec<MissingRecommend>>,
    pub stats: GraphSummary,
}

/// Resolve `names` and analyze them.
///
/// An empty `names` list analyzes every installed package, or only the
/// manually installed ones with [`AnalysisOptions::manual_only`].
///
/// # Errors
///
/// Returns [`AnalysisError::UnresolvedPackages`] if any name is unknown
/// (all of them are listed), or [`AnalysisError::RootWithoutSeed`] on an
/// internal inconsistency.
#[instrument(skip(resolver, options), fields(requested = names.len()))]
pub fn analyze<R: Resolver + ?Sized>(
    resolver: &R,
    names: &[String],
    options: &AnalysisOptions,
) -> Result<Report, AnalysisError> {
    let seed = if names.is_empty() && options.manual_only {
        SeedSet::manual(resolver)
    } else {
        SeedSet::resolve(resolver, names)?
    };
    analyze_seed(resolver, &seed, options)
}

/// Analyze an already resolved seed set.
///
/// # Errors
///
/// Returns [`AnalysisError::RootWithoutSeed`] on an internal inconsistency.
pub fn analyze_seed<R: Resolver + ?Sized>(
    resolver: &R,
    seed: &SeedSet,
    options: &AnalysisOptions,
) -> Result<Report, AnalysisError> {
    let graph = DependencyGraph::build(resolver, seed, options.build);
    let condensation = Condensation::from_graph(&graph);
    let top = TopLevel::find(&condensation, seed, &options.always_present)?;

    let native = resolver.native_arch();
    let top_level: Vec<TopLevelEntry> = top
        .reported()
        .map(|root| TopLevelEntry {
            name: display_name(&root.representative, native),
            members: root.seed_members.iter().map(|id| display_name(id, native)).collect(),
        })
        .collect();

    let missing_recommends = options.show_missing_recommends.then(|| {
        trace_missing_recommends(&graph, seed, &top.representatives())
            .into_iter()
            .map(|(id, provenance)| MissingRecommend {
                name: display_name(&id, native),
                via: provenance.via.iter().map(|id| display_name(id, native)).collect(),
                by: provenance.by.iter().map(|id| display_name(id, native)).collect(),
            })
            .collect::<Vec<_>>()
    });

    let stats = GraphSummary {
        seeds: seed.len(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        components: condensation.scc_count(),
        cycles: condensation.cycle_count(),
        suppressed_roots: top.roots().iter().filter(|r| r.suppressed).count(),
    };

    info!(
        top_level = top_level.len(),
        missing_recommends = missing_recommends.as_ref().map_or(0, Vec::len),
        nodes = stats.nodes,
        edges = stats.edges,
        "analysis complete"
    );

    Ok(Report {
        top_level,
        missing_recommends,
        stats,
    })
}

/// `name` for native-architecture packages, `name:arch` otherwise.
#[must_use]
pub fn display_name(id: &PackageId, native_arch: &str) -> String {
    if id.arch == native_arch {
        id.name.clone()
    } else {
        id.to_string()
    }
}
