#![forbid(unsafe_code)]
//! toplevel-core library.
//!
//! Package data model, Debian control-file and version handling, and the
//! dpkg/apt database adapter consumed by `toplevel-graph`.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per module; `anyhow::Result` for
//!   configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod control;
pub mod database;
pub mod error;
pub mod package;
pub mod version;

pub use database::{Database, DatabaseError, DatabaseOptions, Resolver};
pub use error::ErrorCode;
pub use package::{
    Alternative, ArchQualifier, DependencyGroup, DependencyKind, Package, PackageId, Priority,
};
pub use version::DebVersion;
