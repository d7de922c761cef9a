//! Package dependency graph module.
//!
//! # Overview
//!
//! This module builds a petgraph-based directed multigraph of package
//! relations from a seed set, condenses its cycles, and answers the two
//! structural questions the tool exists for: which packages are top-level,
//! and which recommended packages are missing.
//!
//! ## Pipeline
//!
//! ```text
//! SeedSet + Resolver
//!        ↓  build::DependencyGraph::build()
//! DependencyGraph (labeled multigraph, possibly cyclic)
//!        ├─ condense::Condensation::from_graph()
//!        │     ↓
//!        │  Condensation (DAG of SCCs)
//!        │     ↓  roots::TopLevel::find()
//!        │  TopLevel (root SCCs and their representatives)
//!        │     │
//!        └─────┴─ recommends::trace_missing_recommends()
//!                    ↓
//!                 missing recommends with provenance
//! ```
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! use toplevel_core::{Database, DatabaseOptions};
//! use toplevel_graph::graph::{BuildOptions, Condensation, DependencyGraph, TopLevel};
//! use toplevel_graph::SeedSet;
//!
//! let db = Database::open(Path::new("/"), &DatabaseOptions::default())?;
//! let seed = SeedSet::resolve(&db, &[])?;
//! let graph = DependencyGraph::build(&db, &seed, BuildOptions::default());
//! let condensed = Condensation::from_graph(&graph);
//! let top = TopLevel::find(&condensed, &seed, &Priority::ALWAYS_PRESENT)?;
//!
//! for root in top.reported() {
//!     println!("{}", root.representative.name);
//! }
//! ```

pub mod build;
pub mod condense;
pub mod recommends;
pub mod roots;

// Re-export primary types at module level for convenience.
pub use build::{BuildOptions, DependencyGraph};
pub use condense::{Condensation, SccNode};
pub use recommends::{Provenance, trace_missing_recommends};
pub use roots::{RootComponent, TopLevel};
