#![forbid(unsafe_code)]
//! toplevel-graph library.
//!
//! Builds the package dependency graph for a seed set, condenses its cycles,
//! finds the top-level packages, and traces missing recommends.
//!
//! # Conventions
//!
//! - **Errors**: [`AnalysisError`] for everything the pipeline can fail with.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod analyze;
pub mod error;
pub mod graph;
pub mod seed;

#[cfg(test)]
mod testutil;

pub use analyze::{
    AnalysisOptions, GraphSummary, MissingRecommend, Report, TopLevelEntry, analyze, analyze_seed,
};
pub use error::AnalysisError;
pub use seed::SeedSet;
