//! BuildBackend trait definition.
//!
//! A backend turns a source tree into an output root holding `bin/`.
//! Everything around it (tool checks, hash verification, the store) is the
//! builder's job.

use std::path::{Path, PathBuf};

use crate::builder::closure;
use crate::builder::errors::BuildError;
use crate::builder::toolset::Toolset;
use crate::core::artifact::ArtifactSpec;
use crate::core::platform::Platform;

/// Everything a backend sees for one build.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub spec: &'a ArtifactSpec,
    pub platform: &'a Platform,
    pub toolset: &'a Toolset,

    /// Scratch directory kept between builds of the same artifact
    pub target_dir: PathBuf,

    /// Parallel job count
    pub jobs: Option<usize>,

    /// Absolute directories left out of the source closure
    pub excluded: Vec<PathBuf>,
}

impl<'a> BuildRequest<'a> {
    pub fn new(
        spec: &'a ArtifactSpec,
        platform: &'a Platform,
        toolset: &'a Toolset,
        target_dir: PathBuf,
    ) -> Self {
        BuildRequest {
            spec,
            platform,
            toolset,
            target_dir,
            jobs: None,
            excluded: Vec::new(),
        }
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_excluded(mut self, excluded: Vec<PathBuf>) -> Self {
        self.excluded = excluded;
        self
    }
}

/// An external build backend.
pub trait BuildBackend {
    /// Backend identifier, part of the closure hash.
    fn id(&self) -> &str;

    /// Recompute the hash of the request's resolved closure.
    fn closure_hash(&self, req: &BuildRequest<'_>) -> Result<String, BuildError> {
        closure::closure_hash(self.id(), req)
    }

    /// Build into `out_dir`, which must end up holding `bin/<executable>`.
    ///
    /// Blocking; the backend may parallelise internally.
    fn build(&self, req: &BuildRequest<'_>, out_dir: &Path) -> Result<(), BuildError>;
}
