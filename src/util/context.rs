//! Global context for berth operations.
//!
//! Provides centralized access to configuration paths and the environment.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use thiserror::Error;

use crate::util::diagnostic::suggestions;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Berth.toml";

/// Lockfile name, next to the manifest.
pub const LOCKFILE_NAME: &str = "Berth.lock";

/// Environment variable overriding the berth home directory.
pub const HOME_ENV: &str = "BERTH_HOME";

/// Project directories for berth
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "berth", "berth"));

/// Error locating the project manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("could not find `{name}` in `{dir}` or any parent directory\n{hint}", name = MANIFEST_NAME, hint = suggestions::NO_MANIFEST)]
    NotFound { dir: PathBuf },
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global berth data
    home: PathBuf,

    /// Cache directory for fetched inputs
    cache: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext from the process environment.
    ///
    /// `BERTH_HOME` replaces both the home and cache directories, which keeps
    /// test runs and CI jobs out of the user's real cache.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let (home, cache) = if let Some(home) = std::env::var_os(HOME_ENV) {
            let home = PathBuf::from(home);
            (home.clone(), home.join("cache"))
        } else {
            let home = BaseDirs::new()
                .map(|b| b.home_dir().join(".berth"))
                .unwrap_or_else(|| PathBuf::from(".berth"));
            let cache = PROJECT_DIRS
                .as_ref()
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .unwrap_or_else(|| home.join("cache"));
            (home, cache)
        };

        Ok(GlobalContext { cwd, home, cache })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the berth home directory (~/.berth/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global cache directory for fetched inputs.
    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Find `Berth.toml` starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestError> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                return Err(ManifestError::NotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }
}

/// Get the project-local berth directory.
pub fn project_berth_dir(project_root: &Path) -> PathBuf {
    project_root.join(".berth")
}

/// Get the project config path (.berth/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_berth_dir(project_root).join("config.toml")
}

/// Get the default artifact store (.berth/store).
pub fn default_store_dir(project_root: &Path) -> PathBuf {
    project_berth_dir(project_root).join("store")
}
