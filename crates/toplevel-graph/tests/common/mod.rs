//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;

use toplevel_core::{
    Alternative, Database, DebVersion, DependencyGroup, DependencyKind, Package, PackageId,
    Priority,
};

pub fn id(name: &str) -> PackageId {
    PackageId::new(name, "amd64")
}

/// An installed `amd64` package with the given relations.
///
/// Each entry of `relations` is one OR group; single-name groups are the
/// common case.
pub fn package(name: &str, relations: &[(DependencyKind, &[&str])]) -> Package {
    let mut package = Package {
        id: id(name),
        version: DebVersion::parse("1.0-1").expect("version"),
        installed: true,
        auto_installed: false,
        arch_all: false,
        dependencies: Vec::new(),
        recommends: Vec::new(),
        provides: BTreeSet::new(),
        priority: Priority::Optional,
    };
    for (kind, names) in relations {
        let group = DependencyGroup::new(
            *kind,
            names.iter().map(|n| Alternative::new(*n)).collect(),
        );
        if *kind == DependencyKind::Recommends {
            package.recommends.push(group);
        } else {
            package.dependencies.push(group);
        }
    }
    package
}

pub fn leaf(name: &str) -> Package {
    package(name, &[])
}

pub fn database(packages: impl IntoIterator<Item = Package>) -> Database {
    Database::from_packages("amd64", packages)
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}
