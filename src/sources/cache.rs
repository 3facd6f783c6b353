//! Source cache management.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::input::{InputReference, Locator};
use crate::resolver::ResolutionError;
use crate::sources::{GitSource, PathSource, Snapshot, Source};

/// Creates sources for input references and remembers their snapshots.
///
/// A reference shared by several platforms is fetched once per cache.
pub struct SourceCache {
    /// Cache directory for fetched sources
    cache_dir: PathBuf,

    /// Directory relative path inputs are taken from
    root: PathBuf,

    /// Never touch the network
    offline: bool,

    /// Snapshots by reference
    snapshots: HashMap<InputReference, Snapshot>,
}

impl SourceCache {
    /// Create a new source cache.
    pub fn new(cache_dir: PathBuf, root: PathBuf) -> Self {
        SourceCache {
            cache_dir,
            root,
            offline: false,
            snapshots: HashMap::new(),
        }
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Create a source for the given reference.
    fn create_source(&self, reference: &InputReference) -> Result<Box<dyn Source>, ResolutionError> {
        match &reference.locator {
            Locator::Path(path) => {
                if let Some(pin) = &reference.pin {
                    return Err(ResolutionError::InvalidLocator {
                        locator: reference.locator.to_string(),
                        reason: format!("path inputs cannot be pinned (got `{}`)", pin),
                    });
                }
                Ok(Box::new(PathSource::new(&reference.name, &self.root, path)))
            }
            Locator::Git { url, reference: git_ref } => Ok(Box::new(
                GitSource::new(
                    &reference.name,
                    url.clone(),
                    git_ref.clone(),
                    reference.pin.clone(),
                    &self.cache_dir,
                )
                .offline(self.offline),
            )),
        }
    }

    /// Fetch a reference, or return the snapshot fetched earlier.
    pub fn snapshot(&mut self, reference: &InputReference) -> Result<Snapshot, ResolutionError> {
        if let Some(snapshot) = self.snapshots.get(reference) {
            tracing::debug!("input `{}` already resolved", reference.name);
            return Ok(snapshot.clone());
        }

        let mut source = self.create_source(reference)?;
        tracing::debug!(
            "resolving `{}` from {} source (cached: {})",
            reference,
            source.name(),
            source.is_cached()
        );
        let snapshot = source.fetch()?;
        self.snapshots.insert(reference.clone(), snapshot.clone());
        Ok(snapshot)
    }

    /// Number of distinct references fetched so far.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_is_memoised() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();

        let mut cache = SourceCache::new(tmp.path().join("cache"), project.clone());
        let reference = InputReference::parse("self@./.").unwrap();

        let first = cache.snapshot(&reference).unwrap();
        let second = cache.snapshot(&reference).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.path, project);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_pinned_path_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut cache = SourceCache::new(tmp.path().join("cache"), tmp.path().to_path_buf());
        let reference = InputReference::parse("self@./.").unwrap().with_pin("abc");
        assert!(matches!(
            cache.snapshot(&reference),
            Err(ResolutionError::InvalidLocator { .. })
        ));
        assert!(cache.is_empty());
    }
}
