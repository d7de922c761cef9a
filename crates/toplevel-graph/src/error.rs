use toplevel_core::{ErrorCode, PackageId};

/// Errors produced by the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// One or more requested seed names are unknown to the package database.
    /// Every name is checked before this is returned.
    #[error("could not find in package database: {}", .0.join(", "))]
    UnresolvedPackages(Vec<String>),

    /// A root component of the condensation contains no seed package.
    ///
    /// Traversal only ever starts at seed packages, so this means the graph
    /// builder or condenser is broken, not that the input is bad.
    #[error(
        "internal error: root component {} contains no seed package",
        display_members(.members)
    )]
    RootWithoutSeed { members: Vec<PackageId> },
}

impl AnalysisError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnresolvedPackages(_) => ErrorCode::PackageNotFound,
            Self::RootWithoutSeed { .. } => ErrorCode::InternalInvariant,
        }
    }
}

fn display_members(members: &[PackageId]) -> String {
    let names: Vec<String> = members.iter().map(ToString::to_string).collect();
    format!("({})", names.join(" "))
}
