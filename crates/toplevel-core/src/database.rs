//! The package database adapter.
//!
//! # Overview
//!
//! The graph code consumes packages through the [`Resolver`] trait and never
//! touches files itself. [`Database`] is the production implementation: it
//! reads the dpkg status file and, optionally, the apt list indexes below a
//! root directory and answers lookups from an in-memory index.
//!
//! ## Files
//!
//! ```text
//! <root>/
//!   var/lib/dpkg/status              # installed packages (required)
//!   var/lib/dpkg/arch                # extra architectures, native first (optional)
//!   var/lib/apt/lists/*_Packages     # available versions (optional)
//!   var/lib/apt/extended_states      # `Auto-Installed: 1` marks (optional)
//! ```
//!
//! ## Version selection
//!
//! Several versions of one `(name, arch)` can be known at once (installed
//! plus available). Lookups return the result of [`select_version`]: the
//! installed version if there is one, otherwise the highest available one.
//!
//! ## Architecture `all`
//!
//! Architecture-independent packages are indexed under the native
//! architecture, and also satisfy lookups for foreign architectures. That
//! holds for the virtual names they provide as well.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::control::{self, ControlError, Paragraph};
use crate::error::ErrorCode;
use crate::package::{DependencyGroup, DependencyKind, Package, PackageId, Priority};
use crate::version::{DebVersion, VersionError};

pub const STATUS_PATH: &str = "var/lib/dpkg/status";
pub const ARCH_PATH: &str = "var/lib/dpkg/arch";
pub const LISTS_DIR: &str = "var/lib/apt/lists";
pub const EXTENDED_STATES_PATH: &str = "var/lib/apt/extended_states";

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Everything the dependency analysis needs from a package database.
pub trait Resolver {
    /// Native architecture of the analyzed system.
    fn native_arch(&self) -> &str;

    /// Look up a concrete (non-virtual) package.
    fn resolve(&self, name: &str, arch: &str) -> Option<Package>;

    /// Installed packages providing the virtual `name` for `arch`, sorted by id.
    fn providers(&self, name: &str, arch: &str) -> Vec<Package>;

    /// Every installed package, sorted by id.
    fn installed(&self) -> Vec<Package>;

    /// Installed packages that apt does not mark as automatically installed,
    /// sorted by id.
    fn manual(&self) -> Vec<Package> {
        self.installed().into_iter().filter(|p| !p.auto_installed).collect()
    }

    /// Resolve a user-supplied `name` or `name:arch`.
    fn resolve_qualified(&self, qualified: &str) -> Option<Package> {
        match qualified.split_once(':') {
            Some((name, arch)) => self.resolve(name, arch),
            None => self.resolve(qualified, self.native_arch()),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while loading the package database. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: ControlError,
    },

    #[error("{}: package {package}: {source}", path.display())]
    BadVersion {
        path: PathBuf,
        package: String,
        #[source]
        source: VersionError,
    },

    #[error("{}: paragraph {index} has no {field} field", path.display())]
    MissingField {
        path: PathBuf,
        index: usize,
        field: &'static str,
    },
}

impl DatabaseError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unreadable { .. } => ErrorCode::DatabaseUnreadable,
            Self::Malformed { .. } | Self::BadVersion { .. } | Self::MissingField { .. } => {
                ErrorCode::DatabaseMalformed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Version selection
// ---------------------------------------------------------------------------

/// Pick the version a lookup should return.
///
/// The installed candidate wins; otherwise the maximum by [`DebVersion`]
/// order. Among equal versions the first candidate is kept.
#[must_use]
pub fn select_version(candidates: &[Package]) -> Option<&Package> {
    if let Some(installed) = candidates.iter().find(|p| p.installed) {
        return Some(installed);
    }
    candidates.iter().fold(None, |best: Option<&Package>, p| match best {
        Some(b) if b.version >= p.version => Some(b),
        _ => Some(p),
    })
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// Options for [`Database::open`].
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// Override the native architecture instead of detecting it.
    pub native_arch: Option<String>,
    /// Also load available versions from apt list indexes.
    pub read_apt_lists: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            native_arch: None,
            read_apt_lists: true,
        }
    }
}

/// In-memory package index built from dpkg/apt metadata.
#[derive(Debug, Clone)]
pub struct Database {
    native_arch: String,
    selected: BTreeMap<PackageId, Package>,
    /// Names of packages whose control data says `Architecture: all`.
    arch_all: BTreeSet<String>,
    /// `(virtual name, arch)` → installed providers.
    virtuals: BTreeMap<(String, String), BTreeSet<PackageId>>,
}

impl Database {
    /// Load the package database below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError`] if the status file (or an apt list that
    /// exists) cannot be read or parsed. Nothing partial is returned.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn open(root: &Path, options: &DatabaseOptions) -> Result<Self, DatabaseError> {
        let status_path = root.join(STATUS_PATH);
        let status = read_paragraphs(&status_path)?;

        let native_arch = match &options.native_arch {
            Some(arch) => arch.clone(),
            None => detect_native_arch(root, &status),
        };
        debug!(native_arch = %native_arch, "native architecture");

        let auto = read_auto_installed(&root.join(EXTENDED_STATES_PATH), &native_arch)?;

        let mut packages = Vec::new();
        for (index, paragraph) in status.iter().enumerate() {
            if !is_installed_status(paragraph.get("Status")) {
                continue;
            }
            let mut package = to_package(&status_path, index, paragraph, &native_arch, true)?;
            package.auto_installed = auto.contains(&package.id);
            packages.push(package);
        }
        debug!(
            count = packages.len(),
            auto_installed = packages.iter().filter(|p| p.auto_installed).count(),
            "installed packages loaded"
        );

        if options.read_apt_lists {
            for path in list_index_files(&root.join(LISTS_DIR))? {
                let paragraphs = read_paragraphs(&path)?;
                for (index, paragraph) in paragraphs.iter().enumerate() {
                    packages.push(to_package(&path, index, paragraph, &native_arch, false)?);
                }
                debug!(path = %path.display(), count = paragraphs.len(), "apt list loaded");
            }
        }

        Ok(Self::from_selected_versions(native_arch, packages))
    }

    /// Build a database from package snapshots already in memory.
    ///
    /// Packages whose architecture is `all` are re-keyed to `native_arch`.
    #[must_use]
    pub fn from_packages(
        native_arch: impl Into<String>,
        packages: impl IntoIterator<Item = Package>,
    ) -> Self {
        let native_arch = native_arch.into();
        let packages = packages
            .into_iter()
            .map(|mut package| {
                if package.id.arch == "all" {
                    package.id.arch.clone_from(&native_arch);
                    package.arch_all = true;
                }
                package
            })
            .collect();
        Self::from_selected_versions(native_arch, packages)
    }

    fn from_selected_versions(native_arch: String, packages: Vec<Package>) -> Self {
        let mut versions: BTreeMap<PackageId, Vec<Package>> = BTreeMap::new();
        let mut arch_all = BTreeSet::new();
        for package in packages {
            if package.arch_all {
                arch_all.insert(package.id.name.clone());
            }
            versions.entry(package.id.clone()).or_default().push(package);
        }

        let selected: BTreeMap<PackageId, Package> = versions
            .into_iter()
            .filter_map(|(id, candidates)| select_version(&candidates).cloned().map(|p| (id, p)))
            .collect();

        let mut virtuals: BTreeMap<(String, String), BTreeSet<PackageId>> = BTreeMap::new();
        for package in selected.values().filter(|p| p.installed) {
            for name in &package.provides {
                virtuals
                    .entry((name.clone(), package.id.arch.clone()))
                    .or_default()
                    .insert(package.id.clone());
            }
        }

        Self {
            native_arch,
            selected,
            arch_all,
            virtuals,
        }
    }

    /// Number of distinct `(name, arch)` entries known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    fn indexed_providers(&self, name: &str, arch: &str) -> impl Iterator<Item = &Package> {
        self.virtuals
            .get(&(name.to_string(), arch.to_string()))
            .into_iter()
            .flatten()
            .filter_map(move |id| self.selected.get(id))
    }
}

impl Resolver for Database {
    fn native_arch(&self) -> &str {
        &self.native_arch
    }

    fn resolve(&self, name: &str, arch: &str) -> Option<Package> {
        let arch = if arch == "all" { self.native_arch.as_str() } else { arch };
        if let Some(package) = self.selected.get(&PackageId::new(name, arch)) {
            return Some(package.clone());
        }
        if arch != self.native_arch && self.arch_all.contains(name) {
            return self
                .selected
                .get(&PackageId::new(name, self.native_arch.as_str()))
                .cloned();
        }
        None
    }

    fn providers(&self, name: &str, arch: &str) -> Vec<Package> {
        let arch = if arch == "all" { self.native_arch.as_str() } else { arch };
        let mut found: BTreeMap<&PackageId, &Package> = self
            .indexed_providers(name, arch)
            .map(|p| (&p.id, p))
            .collect();
        if arch != self.native_arch {
            found.extend(
                self.indexed_providers(name, &self.native_arch)
                    .filter(|p| p.arch_all)
                    .map(|p| (&p.id, p)),
            );
        }
        found.into_values().cloned().collect()
    }

    fn installed(&self) -> Vec<Package> {
        self.selected.values().filter(|p| p.installed).cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn read_paragraphs(path: &Path) -> Result<Vec<Paragraph>, DatabaseError> {
    let text = fs::read_to_string(path).map_err(|source| DatabaseError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    control::parse_paragraphs(&text).map_err(|source| DatabaseError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// dpkg's `Status: want flag state`; everything but `not-installed` and
/// `config-files` has an installed version on disk.
fn is_installed_status(status: Option<&str>) -> bool {
    status
        .and_then(|s| s.split_whitespace().nth(2))
        .is_some_and(|state| !matches!(state, "not-installed" | "config-files"))
}

fn to_package(
    path: &Path,
    index: usize,
    paragraph: &Paragraph,
    native_arch: &str,
    installed: bool,
) -> Result<Package, DatabaseError> {
    let missing = |field| DatabaseError::MissingField {
        path: path.to_path_buf(),
        index,
        field,
    };

    let name = paragraph.get("Package").ok_or_else(|| missing("Package"))?;
    let raw_version = paragraph.get("Version").ok_or_else(|| missing("Version"))?;
    let version = DebVersion::parse(raw_version).map_err(|source| DatabaseError::BadVersion {
        path: path.to_path_buf(),
        package: name.to_string(),
        source,
    })?;

    let raw_arch = paragraph.get("Architecture").unwrap_or("all");
    let arch_all = raw_arch == "all";
    let arch = if arch_all { native_arch } else { raw_arch };

    let groups = |kind: DependencyKind| -> Vec<DependencyGroup> {
        paragraph
            .get(kind.field_name())
            .map(|field| {
                control::parse_relations(field, native_arch)
                    .into_iter()
                    .map(|alternatives| DependencyGroup::new(kind, alternatives))
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut dependencies = groups(DependencyKind::PreDepends);
    dependencies.extend(groups(DependencyKind::Depends));

    let priority = paragraph
        .get("Priority")
        .map_or(Priority::Unknown, |p| p.parse().unwrap_or_default());

    Ok(Package {
        id: PackageId::new(name, arch),
        version,
        installed,
        auto_installed: false,
        arch_all,
        dependencies,
        recommends: groups(DependencyKind::Recommends),
        provides: paragraph
            .get("Provides")
            .map(control::parse_provides)
            .unwrap_or_default(),
        priority,
    })
}

/// Packages apt marks `Auto-Installed: 1` in its extended states file.
///
/// Stanzas without an `Architecture` field (older apt) mean the native one.
/// A missing file marks nothing.
fn read_auto_installed(
    path: &Path,
    native_arch: &str,
) -> Result<BTreeSet<PackageId>, DatabaseError> {
    if !path.exists() {
        debug!(path = %path.display(), "no extended states file");
        return Ok(BTreeSet::new());
    }

    let mut auto = BTreeSet::new();
    for paragraph in read_paragraphs(path)? {
        if paragraph.get("Auto-Installed").map(str::trim) != Some("1") {
            continue;
        }
        let Some(name) = paragraph.get("Package") else {
            continue;
        };
        let arch = match paragraph.get("Architecture") {
            None | Some("all") => native_arch,
            Some(arch) => arch,
        };
        auto.insert(PackageId::new(name, arch));
    }
    Ok(auto)
}

/// Uncompressed apt `*_Packages` indexes, sorted by path. A missing lists
/// directory is not an error.
fn list_index_files(dir: &Path) -> Result<Vec<PathBuf>, DatabaseError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(DatabaseError::Unreadable {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DatabaseError::Unreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name.ends_with("_Packages") {
            files.push(path);
        } else if file_name.contains("_Packages.") {
            debug!(path = %path.display(), "skipping compressed apt list");
        }
    }
    files.sort();
    Ok(files)
}

fn detect_native_arch(root: &Path, status: &[Paragraph]) -> String {
    if let Ok(text) = fs::read_to_string(root.join(ARCH_PATH)) {
        if let Some(first) = text.lines().map(str::trim).find(|l| !l.is_empty()) {
            return first.to_string();
        }
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for paragraph in status {
        if let Some(arch) = paragraph.get("Architecture") {
            if arch != "all" {
                *counts.entry(arch).or_default() += 1;
            }
        }
    }
    // Ties go to the alphabetically first architecture.
    if let Some((arch, _)) = counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
    {
        return arch.to_string();
    }

    let fallback = host_debian_arch();
    warn!(arch = fallback, "could not detect native architecture, using build target");
    fallback.to_string()
}

fn host_debian_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "powerpc64" => "ppc64el",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
