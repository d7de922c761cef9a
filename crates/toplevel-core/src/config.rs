use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::package::Priority;

/// User configuration from `<config dir>/apt-toplevel/config.toml`.
///
/// Every key is optional. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    #[serde(default)]
    pub follow_unspecified_packages: bool,
    #[serde(default = "default_true")]
    pub use_recommends: bool,
    #[serde(default)]
    pub show_missing_recommends: bool,
    /// Without package arguments, analyze only manually installed packages.
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub native_arch: Option<String>,
    #[serde(default = "default_always_present")]
    pub always_present: Vec<Priority>,
    #[serde(default = "default_true")]
    pub read_apt_lists: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: None,
            follow_unspecified_packages: false,
            use_recommends: default_true(),
            show_missing_recommends: false,
            manual: false,
            native_arch: None,
            always_present: default_always_present(),
            read_apt_lists: default_true(),
        }
    }
}

impl Config {
    /// Root directory to analyze, `/` unless configured.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root_dir.as_deref().unwrap_or_else(|| Path::new("/"))
    }
}

/// Path of the user config file, if the platform has a config directory.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("apt-toplevel/config.toml"))
}

/// Load the user config, falling back to defaults when there is none.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(Config::default()),
    }
}

/// Load the config at `path`; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_true() -> bool {
    true
}

fn default_always_present() -> Vec<Priority> {
    Priority::ALWAYS_PRESENT.to_vec()
}
