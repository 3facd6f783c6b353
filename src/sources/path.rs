//! Path source - inputs from the local filesystem.

use std::path::{Path, PathBuf};

use crate::resolver::ResolutionError;
use crate::sources::source::{Snapshot, Source};
use crate::util::fs::absolutize;

/// A source for local directory inputs.
pub struct PathSource {
    /// Input name, for error messages
    name: String,

    /// The directory as written in the manifest
    declared: PathBuf,

    /// The directory, made absolute against the project root
    path: PathBuf,
}

impl PathSource {
    /// Create a new path source. Relative paths are taken from `root`.
    pub fn new(name: impl Into<String>, root: &Path, declared: &Path) -> Self {
        PathSource {
            name: name.into(),
            declared: declared.to_path_buf(),
            path: absolutize(root, declared),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for PathSource {
    fn name(&self) -> &str {
        "path"
    }

    fn is_cached(&self) -> bool {
        true
    }

    fn fetch(&mut self) -> Result<Snapshot, ResolutionError> {
        if !self.path.is_dir() {
            let reason = if self.path.exists() {
                format!("`{}` is not a directory", self.path.display())
            } else {
                format!("directory `{}` does not exist", self.path.display())
            };
            return Err(ResolutionError::NotFound {
                name: self.name.clone(),
                locator: self.declared.display().to_string(),
                reason,
            });
        }

        tracing::debug!("input `{}` is local at {}", self.name, self.path.display());

        Ok(Snapshot {
            path: self.path.clone(),
            revision: None,
        })
    }
}
