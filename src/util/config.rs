//! Configuration file support for berth.
//!
//! Two configuration file locations are read:
//! - Global: `~/.berth/config.toml` - User-wide defaults
//! - Project: `.berth/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! and environment variables take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// berth configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Composition settings
    pub compose: ComposeConfig,

    /// Network settings
    pub net: NetConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Directory holding built artifacts (defaults to `.berth/store`)
    pub store_dir: Option<PathBuf>,

    /// Parallel jobs handed to the build backend (None = backend default)
    pub jobs: Option<usize>,
}

/// Composition-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ComposeConfig {
    /// Directory of the companion project used by the local profiles
    pub sibling: Option<PathBuf>,

    /// Name of the service-discovery variable
    pub discovery_var: Option<String>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Offline mode (don't fetch git inputs from the network)
    #[serde(default)]
    pub offline: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.store_dir.is_some() {
            self.build.store_dir = other.build.store_dir;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }

        if other.compose.sibling.is_some() {
            self.compose.sibling = other.compose.sibling;
        }
        if other.compose.discovery_var.is_some() {
            self.compose.discovery_var = other.compose.discovery_var;
        }

        if other.net.offline {
            self.net.offline = true;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.berth/config.toml)
/// 2. Global config (~/.berth/config.toml)
/// 3. Defaults
///
/// Relative paths in the project config are taken relative to the project
/// root, so `sibling = "../shellac-server"` means the same thing wherever
/// berth is invoked from.
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
