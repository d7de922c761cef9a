//! Package snapshots as supplied by the package database.
//!
//! Everything in this module is an immutable value type. The graph code
//! never mutates a [`Package`]; it only reads its relations.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::version::DebVersion;

// ---------------------------------------------------------------------------
// PackageId
// ---------------------------------------------------------------------------

/// Stable identity of a package: `(name, architecture)`.
///
/// Ordered by name, then architecture. Every tie-break and every sorted
/// output in the workspace uses this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PackageId {
    pub name: String,
    pub arch: String,
}

impl PackageId {
    #[must_use]
    pub fn new(name: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arch: arch.into(),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.arch)
    }
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// Label of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DependencyKind {
    Depends,
    PreDepends,
    Recommends,
}

impl DependencyKind {
    /// Control-file field name for this kind.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Depends => "Depends",
            Self::PreDepends => "Pre-Depends",
            Self::Recommends => "Recommends",
        }
    }

    /// `true` for hard dependencies (Depends and Pre-Depends).
    #[must_use]
    pub const fn is_hard(self) -> bool {
        matches!(self, Self::Depends | Self::PreDepends)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Architecture qualifier attached to a dependency alternative.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArchQualifier {
    /// No qualifier: same architecture as the depending package.
    Same,
    /// `:any`: satisfiable from any architecture; resolved like [`Self::Same`].
    Any,
    /// `:native`: the native architecture of the system.
    Native,
    /// An explicit architecture such as `:i386`.
    Exact(String),
}

impl ArchQualifier {
    /// Architecture to look the alternative up under.
    #[must_use]
    pub fn resolve<'a>(&'a self, owner_arch: &'a str, native_arch: &'a str) -> &'a str {
        match self {
            Self::Same | Self::Any => owner_arch,
            Self::Native => native_arch,
            Self::Exact(arch) => arch,
        }
    }
}

impl From<&str> for ArchQualifier {
    fn from(qualifier: &str) -> Self {
        match qualifier {
            "" => Self::Same,
            "any" => Self::Any,
            "native" => Self::Native,
            other => Self::Exact(other.to_string()),
        }
    }
}

/// One alternative of an OR group: a (possibly virtual) name and its
/// architecture qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Alternative {
    pub name: String,
    pub arch: ArchQualifier,
}

impl Alternative {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arch: ArchQualifier::Same,
        }
    }

    #[must_use]
    pub fn with_arch(mut self, arch: ArchQualifier) -> Self {
        self.arch = arch;
        self
    }
}

/// An ordered list of alternatives, any one of which satisfies the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    pub kind: DependencyKind,
    pub alternatives: Vec<Alternative>,
}

impl DependencyGroup {
    #[must_use]
    pub const fn new(kind: DependencyKind, alternatives: Vec<Alternative>) -> Self {
        Self { kind, alternatives }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Debian priority classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Required,
    Important,
    Standard,
    Optional,
    Extra,
    #[default]
    Unknown,
}

impl Priority {
    /// Priorities whose packages are assumed present on every system.
    pub const ALWAYS_PRESENT: [Self; 2] = [Self::Required, Self::Important];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Important => "important",
            Self::Standard => "standard",
            Self::Optional => "optional",
            Self::Extra => "extra",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for Priority {
    type Err = std::convert::Infallible;

    /// Case-insensitive; anything unrecognized becomes [`Priority::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "required" => Self::Required,
            "important" => Self::Important,
            "standard" => Self::Standard,
            "optional" => Self::Optional,
            "extra" => Self::Extra,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// An immutable snapshot of one package version.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub version: DebVersion,
    pub installed: bool,
    /// Installed only to satisfy another package (apt `Auto-Installed: 1`).
    pub auto_installed: bool,
    /// Control data says `Architecture: all`; `id.arch` is then the native
    /// architecture.
    pub arch_all: bool,
    /// Pre-Depends groups followed by Depends groups.
    pub dependencies: Vec<DependencyGroup>,
    pub recommends: Vec<DependencyGroup>,
    /// Virtual names this package satisfies.
    pub provides: BTreeSet<String>,
    pub priority: Priority,
}

impl Package {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.name
    }

    #[must_use]
    pub fn arch(&self) -> &str {
        &self.id.arch
    }

    /// Dependency groups to follow, with recommends appended when requested.
    pub fn dependency_groups(
        &self,
        use_recommends: bool,
    ) -> impl Iterator<Item = &DependencyGroup> {
        let recommends: &[DependencyGroup] = if use_recommends { &self.recommends } else { &[] };
        self.dependencies.iter().chain(recommends)
    }
}
