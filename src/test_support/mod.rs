//! Test utilities for berth unit tests.
//!
//! Provides a build backend that never runs a compiler and a tool provider
//! with fixed tool locations, plus fixture writers.
//!
//! # Example
//!
//! ```rust,ignore
//! use berth::test_support::{FakeBackend, StaticToolProvider};
//!
//! let backend = FakeBackend::failing_for("aarch64-linux", "linker not found");
//! let tools = StaticToolProvider::new(["cargo", "rustc"]);
//! ```

pub mod fixtures;

use std::cell::Cell;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::{BuildBackend, BuildError, BuildRequest, PackageSet, ToolProvider, Toolset};
use crate::core::platform::Platform;

pub use fixtures::*;

/// Backend that writes a placeholder executable instead of compiling.
#[derive(Debug, Default)]
pub struct FakeBackend {
    failure: Option<String>,
    failing_platform: Option<String>,
    builds: Cell<usize>,
}

impl FakeBackend {
    pub fn new() -> Self {
        FakeBackend::default()
    }

    /// Fail every build with `stderr` as the backend's diagnostics.
    pub fn failing(stderr: impl Into<String>) -> Self {
        FakeBackend {
            failure: Some(stderr.into()),
            ..FakeBackend::default()
        }
    }

    /// Fail only the builds for `platform`.
    pub fn failing_for(platform: &str, stderr: impl Into<String>) -> Self {
        FakeBackend {
            failure: Some(stderr.into()),
            failing_platform: Some(platform.to_string()),
            builds: Cell::new(0),
        }
    }

    /// Number of times the backend was asked to build.
    pub fn builds(&self) -> usize {
        self.builds.get()
    }

    fn fails_on(&self, platform: &Platform) -> Option<&str> {
        let failure = self.failure.as_deref()?;
        match &self.failing_platform {
            Some(only) if *only != platform.to_string() => None,
            _ => Some(failure),
        }
    }
}

impl BuildBackend for FakeBackend {
    fn id(&self) -> &str {
        "fake"
    }

    fn build(&self, req: &BuildRequest<'_>, out_dir: &Path) -> Result<(), BuildError> {
        self.builds.set(self.builds.get() + 1);

        if let Some(stderr) = self.fails_on(req.platform) {
            return Err(BuildError::Backend {
                backend: self.id().to_string(),
                artifact: req.spec.name.clone(),
                code: Some(101),
                diagnostics: stderr.to_string(),
            });
        }

        let exe = out_dir
            .join("bin")
            .join(format!("{}{}", req.spec.bin, std::env::consts::EXE_SUFFIX));
        write_file(&exe, &format!("#!/bin/sh\necho {}\n", req.spec.bin));
        Ok(())
    }
}

/// Tool provider that "finds" a fixed list of tools under `/toolchain/bin`.
#[derive(Debug, Clone)]
pub struct StaticToolProvider {
    tools: Vec<String>,
}

impl StaticToolProvider {
    pub fn new<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticToolProvider {
            tools: tools.into_iter().map(Into::into).collect(),
        }
    }
}

impl ToolProvider for StaticToolProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn toolset(&self, platform: &Platform, packages: &PackageSet) -> Result<Toolset> {
        let mut toolset = Toolset::new(platform.clone());
        for tool in &self.tools {
            if let Some(executable) = packages.get(tool) {
                toolset = toolset.with_tool(tool, PathBuf::from("/toolchain/bin").join(executable));
            }
        }
        Ok(toolset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Overlay;
    use crate::core::artifact::ArtifactSpec;

    #[test]
    fn test_fake_backend_writes_executable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let platform: Platform = "x86_64-linux".parse().unwrap();
        let toolset = Toolset::new(platform.clone());
        let spec = ArtifactSpec::new("ion", tmp.path());
        let req = BuildRequest::new(&spec, &platform, &toolset, tmp.path().join("t"));

        FakeBackend::new().build(&req, &tmp.path().join("out")).unwrap();
        assert!(tmp
            .path()
            .join(format!("out/bin/ion{}", std::env::consts::EXE_SUFFIX))
            .is_file());
    }

    #[test]
    fn test_static_provider_respects_overlay() {
        let packages = PackageSet::base().overlay(&Overlay::new().with_tool("cargo", "cargo-nightly"));
        let toolset = StaticToolProvider::new(["cargo", "protoc"])
            .toolset(&"x86_64-linux".parse().unwrap(), &packages)
            .unwrap();

        assert_eq!(
            toolset.get("cargo"),
            Some(Path::new("/toolchain/bin/cargo-nightly"))
        );
        assert!(!toolset.contains("protoc"));
    }
}
