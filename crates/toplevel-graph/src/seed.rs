//! The seed set: packages the operator asked about.

use std::collections::BTreeMap;

use toplevel_core::{Package, PackageId, Resolver};
use tracing::{debug, instrument, warn};

use crate::error::AnalysisError;

/// Seed packages plus an index of the virtual names they provide.
///
/// Virtual names are keyed by `(name, arch)`. When several seed packages
/// provide the same virtual name, the smallest id wins. Virtual names
/// provided by `Architecture: all` seeds also answer for foreign
/// architectures.
#[derive(Debug, Clone, Default)]
pub struct SeedSet {
    packages: BTreeMap<PackageId, Package>,
    virtuals: BTreeMap<(String, String), PackageId>,
    /// Virtual name → smallest `Architecture: all` seed providing it.
    arch_all_virtuals: BTreeMap<String, PackageId>,
}

impl SeedSet {
    #[must_use]
    pub fn new(packages: impl IntoIterator<Item = Package>) -> Self {
        let mut seed = Self::default();
        for package in packages {
            seed.insert(package);
        }
        seed
    }

    /// Resolve user-supplied names (`name` or `name:arch`) into a seed set.
    ///
    /// An empty `names` list selects every installed package.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnresolvedPackages`] listing *every* name
    /// the resolver does not know, in input order.
    #[instrument(skip(resolver, names), fields(requested = names.len()))]
    pub fn resolve<R: Resolver + ?Sized>(
        resolver: &R,
        names: &[String],
    ) -> Result<Self, AnalysisError> {
        if names.is_empty() {
            let seed = Self::new(resolver.installed());
            debug!(count = seed.len(), "using all installed packages as seed");
            return Ok(seed);
        }

        let mut seed = Self::default();
        let mut missing = Vec::new();
        for name in names {
            match resolver.resolve_qualified(name) {
                Some(package) => seed.insert(package),
                None => {
                    warn!(%name, "package not found");
                    missing.push(name.clone());
                }
            }
        }

        if missing.is_empty() {
            Ok(seed)
        } else {
            Err(AnalysisError::UnresolvedPackages(missing))
        }
    }

    /// Every installed package apt does not mark as automatically installed.
    #[must_use]
    #[instrument(skip(resolver))]
    pub fn manual<R: Resolver + ?Sized>(resolver: &R) -> Self {
        let seed = Self::new(resolver.manual());
        debug!(count = seed.len(), "using manually installed packages as seed");
        seed
    }

    fn insert(&mut self, package: Package) {
        for name in &package.provides {
            keep_smallest(
                &mut self.virtuals,
                (name.clone(), package.id.arch.clone()),
                &package.id,
            );
            if package.arch_all {
                keep_smallest(&mut self.arch_all_virtuals, name.clone(), &package.id);
            }
        }
        self.packages.insert(package.id.clone(), package);
    }

    #[must_use]
    pub fn contains(&self, id: &PackageId) -> bool {
        self.packages.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &PackageId) -> Option<&Package> {
        self.packages.get(id)
    }

    /// Seed package providing the virtual `name` for `arch`.
    #[must_use]
    pub fn provider(&self, name: &str, arch: &str) -> Option<&Package> {
        self.virtuals
            .get(&(name.to_string(), arch.to_string()))
            .or_else(|| self.arch_all_virtuals.get(name))
            .and_then(|id| self.packages.get(id))
    }

    /// Seed packages in id order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Package> {
        self.packages.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

fn keep_smallest<K: Ord>(index: &mut BTreeMap<K, PackageId>, key: K, id: &PackageId) {
    match index.get(&key) {
        Some(existing) if existing <= id => {}
        _ => {
            index.insert(key, id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{db, pkg};

    #[test]
    fn empty_names_select_installed_packages() {
        let mut available = pkg("b");
        available.installed = false;
        let db = db([pkg("a"), available, pkg("c")]);

        let seed = SeedSet::resolve(&db, &[]).expect("resolve");
        let names: Vec<&str> = seed.iter().map(Package::name).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn all_missing_names_are_reported_together() {
        let db = db([pkg("a")]);
        let names = vec!["x".to_string(), "a".to_string(), "y:i386".to_string()];
        let err = SeedSet::resolve(&db, &names).expect_err("must fail");
        assert_eq!(
            err,
            AnalysisError::UnresolvedPackages(vec!["x".to_string(), "y:i386".to_string()])
        );
    }

    #[test]
    fn smallest_seed_provider_wins() {
        let mut exim = pkg("exim4");
        exim.provides.insert("mail-transport-agent".to_string());
        let mut postfix = pkg("postfix");
        postfix.provides.insert("mail-transport-agent".to_string());

        let seed = SeedSet::new([postfix, exim]);
        let provider = seed.provider("mail-transport-agent", "amd64").expect("provider");
        assert_eq!(provider.name(), "exim4");
        assert!(seed.provider("mail-transport-agent", "i386").is_none());
    }

    #[test]
    fn arch_all_seed_provides_for_every_arch() {
        let mut debconf = pkg("debconf");
        debconf.arch_all = true;
        debconf.provides.insert("debconf-2.0".to_string());
        let mut cdebconf = pkg("cdebconf");
        cdebconf.id.arch = "i386".to_string();
        cdebconf.provides.insert("debconf-2.0".to_string());
        let mut mawk = pkg("mawk");
        mawk.provides.insert("awk".to_string());

        let seed = SeedSet::new([debconf, cdebconf, mawk]);
        let name = |arch| seed.provider("debconf-2.0", arch).map(Package::name);
        assert_eq!(name("amd64"), Some("debconf"));
        assert_eq!(name("i386"), Some("cdebconf"), "exact arch match first");
        assert_eq!(name("arm64"), Some("debconf"));
        assert!(seed.provider("awk", "i386").is_none());
    }

    #[test]
    fn manual_seed_skips_auto_installed() {
        let mut lib = pkg("libfoo1");
        lib.auto_installed = true;
        let db = db([pkg("foo"), lib]);

        let seed = SeedSet::manual(&db);
        let names: Vec<&str> = seed.iter().map(Package::name).collect();
        assert_eq!(names, vec!["foo"]);
    }
}
