//! Package fixtures shared by unit tests.

use std::collections::BTreeSet;

use toplevel_core::{
    Alternative, Database, DebVersion, DependencyGroup, DependencyKind, Package, PackageId,
    Priority,
};

pub fn id(name: &str) -> PackageId {
    PackageId::new(name, "amd64")
}

/// An installed, optional-priority `amd64` package without relations.
pub fn pkg(name: &str) -> Package {
    Package {
        id: id(name),
        version: DebVersion::parse("1.0-1").expect("version"),
        installed: true,
        auto_installed: false,
        arch_all: false,
        dependencies: Vec::new(),
        recommends: Vec::new(),
        provides: BTreeSet::new(),
        priority: Priority::Optional,
    }
}

/// Append one OR group of `kind` to `package`.
pub fn with_group(
    mut package: Package,
    kind: DependencyKind,
    alternatives: &[&str],
) -> Package {
    let group = DependencyGroup::new(
        kind,
        alternatives.iter().map(|name| Alternative::new(*name)).collect(),
    );
    if kind == DependencyKind::Recommends {
        package.recommends.push(group);
    } else {
        package.dependencies.push(group);
    }
    package
}

pub fn db(packages: impl IntoIterator<Item = Package>) -> Database {
    Database::from_packages("amd64", packages)
}
