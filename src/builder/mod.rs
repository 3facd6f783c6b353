//! Artifact building.
//!
//! [`ArtifactBuilder`] checks tools, verifies the closure hash and keeps a
//! content-addressed store of finished outputs:
//!
//! ```text
//! <store>/<platform>/<hash[..16]>-<name>/
//!     .berth-hash
//!     bin/<executable>
//!     <data dirs>
//! ```
//!
//! The backend builds into a staging directory next to the final location
//! which is renamed into place only once the build and its data copy
//! succeeded, so a store entry is either complete or absent.

pub mod backend;
pub mod cargo;
pub mod closure;
pub mod errors;
pub mod events;
pub mod toolset;

pub use backend::{BuildBackend, BuildRequest};
pub use cargo::CargoBackend;
pub use errors::BuildError;
pub use events::BuildEvent;
pub use toolset::{HostToolProvider, Overlay, PackageSet, ToolProvider, Toolset};

use std::path::{Path, PathBuf};

use crate::core::artifact::{ArtifactSpec, BuiltArtifact};
use crate::core::platform::Platform;
use crate::util::fs::copy_dir_all;
use crate::util::hash::short;

/// Stamp file recording the closure hash of a completed output.
pub const STAMP_FILE: &str = ".berth-hash";

/// Whether a build ran or an existing output was reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Built,
    Fresh,
}

/// Builds artifacts for one platform.
pub struct ArtifactBuilder<'a> {
    backend: &'a dyn BuildBackend,
    toolset: &'a Toolset,
    store: PathBuf,
    jobs: Option<usize>,
    excluded: Vec<PathBuf>,
}

impl<'a> ArtifactBuilder<'a> {
    /// `store` is the store root shared by all platforms. It never counts
    /// towards a closure, even when it lives inside a source tree.
    pub fn new(backend: &'a dyn BuildBackend, toolset: &'a Toolset, store: impl Into<PathBuf>) -> Self {
        let store = store.into();
        ArtifactBuilder {
            backend,
            toolset,
            excluded: vec![store.clone()],
            store,
            jobs: None,
        }
    }

    /// Leave another berth-owned directory out of every closure.
    pub fn exclude_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn platform(&self) -> &Platform {
        self.toolset.platform()
    }

    fn platform_dir(&self) -> PathBuf {
        self.store.join(self.platform().to_string())
    }

    /// Final location of an output with the given closure hash.
    pub fn output_dir(&self, name: &str, hash: &str) -> PathBuf {
        self.platform_dir().join(format!("{}-{}", short(hash), name))
    }

    /// Build an artifact, reusing a completed output with the same hash.
    pub fn build(&self, spec: &ArtifactSpec) -> Result<BuiltArtifact, BuildError> {
        self.build_with_freshness(spec).map(|(built, _)| built)
    }

    /// Like [`ArtifactBuilder::build`], also reporting whether anything ran.
    pub fn build_with_freshness(
        &self,
        spec: &ArtifactSpec,
    ) -> Result<(BuiltArtifact, Freshness), BuildError> {
        let missing = self.toolset.missing(&spec.tools);
        if !missing.is_empty() {
            return Err(BuildError::MissingTool {
                artifact: spec.name.clone(),
                tools: missing.into_iter().map(String::from).collect(),
                platform: self.platform().to_string(),
            });
        }

        let target_dir = self.platform_dir().join(".target").join(&spec.name);
        let req = BuildRequest::new(spec, self.toolset.platform(), self.toolset, target_dir)
            .with_jobs(self.jobs)
            .with_excluded(self.excluded.clone());

        let actual = self.backend.closure_hash(&req)?;
        if let Some(expected) = &spec.hash {
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(BuildError::HashMismatch {
                    artifact: spec.name.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let out = self.output_dir(&spec.name, &actual);
        let built = BuiltArtifact::new(&spec.name, &out, &actual, &spec.bin);

        if read_stamp(&out).as_deref() == Some(actual.as_str()) {
            tracing::debug!("`{}` is fresh at {}", spec.name, out.display());
            return Ok((built, Freshness::Fresh));
        }

        let platform_dir = self.platform_dir();
        std::fs::create_dir_all(&platform_dir).map_err(|e| BuildError::io(&spec.name, &platform_dir, e))?;

        let staging = tempfile::Builder::new()
            .prefix(&format!(".staging-{}-", spec.name))
            .tempdir_in(&platform_dir)
            .map_err(|e| BuildError::io(&spec.name, &platform_dir, e))?;

        tracing::info!(
            "building `{}` for {} with {}",
            spec.name,
            self.platform(),
            self.backend.id()
        );
        self.backend.build(&req, staging.path())?;
        self.finish_output(spec, staging.path(), &actual)?;

        if out.exists() {
            // Left behind by an interrupted build.
            std::fs::remove_dir_all(&out).map_err(|e| BuildError::io(&spec.name, &out, e))?;
        }
        std::fs::rename(staging.path(), &out).map_err(|e| BuildError::io(&spec.name, &out, e))?;

        Ok((built, Freshness::Built))
    }

    /// Check the backend's output, copy data directories and stamp it.
    fn finish_output(&self, spec: &ArtifactSpec, root: &Path, hash: &str) -> Result<(), BuildError> {
        let exe = root
            .join("bin")
            .join(format!("{}{}", spec.bin, std::env::consts::EXE_SUFFIX));
        if !exe.is_file() {
            return Err(BuildError::Backend {
                backend: self.backend.id().to_string(),
                artifact: spec.name.clone(),
                code: None,
                diagnostics: format!("backend produced no executable at bin/{}", spec.bin),
            });
        }

        for dir in &spec.data {
            let src = spec.source.join(dir);
            if !src.is_dir() {
                return Err(BuildError::io(
                    &spec.name,
                    &src,
                    format!("data directory `{}` does not exist in the source", dir),
                ));
            }
            copy_dir_all(&src, &root.join(dir))
                .map_err(|e| BuildError::io(&spec.name, &src, format!("{:#}", e)))?;
        }

        let stamp = root.join(STAMP_FILE);
        std::fs::write(&stamp, hash).map_err(|e| BuildError::io(&spec.name, &stamp, e))
    }
}

fn read_stamp(out: &Path) -> Option<String> {
    std::fs::read_to_string(out.join(STAMP_FILE))
        .ok()
        .map(|s| s.trim().to_string())
}
