//! Cargo backend - builds artifacts with `cargo install`.

use std::path::Path;

use crate::builder::backend::{BuildBackend, BuildRequest};
use crate::builder::errors::BuildError;
use crate::util::process::ProcessBuilder;

/// Builds a crate's binary with `cargo install --path`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoBackend;

impl CargoBackend {
    pub fn new() -> Self {
        CargoBackend
    }

    /// The `cargo install` invocation for a request.
    fn command(&self, req: &BuildRequest<'_>, out_dir: &Path) -> Result<ProcessBuilder, BuildError> {
        let spec = req.spec;

        let cargo = req.toolset.get("cargo").ok_or_else(|| BuildError::MissingTool {
            artifact: spec.name.clone(),
            tools: vec!["cargo".to_string()],
            platform: req.platform.to_string(),
        })?;

        let triple = req
            .platform
            .rust_triple()
            .ok_or_else(|| BuildError::UnsupportedPlatform {
                backend: self.id().to_string(),
                artifact: spec.name.clone(),
                platform: req.platform.to_string(),
            })?;

        let mut pb = ProcessBuilder::new(cargo)
            .arg("install")
            .arg("--path")
            .arg(&spec.source)
            .arg("--root")
            .arg(out_dir)
            .args(["--target", triple.as_str()])
            .args(["--bin", spec.bin.as_str()])
            .arg("--no-track")
            .arg("--quiet")
            .env("CARGO_TARGET_DIR", &req.target_dir)
            .cwd(&spec.source);

        if spec.source.join("Cargo.lock").exists() {
            pb = pb.arg("--locked");
        }

        if let Some(jobs) = req.jobs {
            pb = pb.arg("--jobs").arg(jobs.to_string());
        }

        if let Some(rustc) = req.toolset.get("rustc") {
            pb = pb.env("RUSTC", rustc);
        }

        pb.prepend_path(req.toolset.bin_dirs())
            .map_err(|e| BuildError::io(&spec.name, &spec.source, format!("{:#}", e)))
    }
}

impl BuildBackend for CargoBackend {
    fn id(&self) -> &str {
        "cargo"
    }

    fn build(&self, req: &BuildRequest<'_>, out_dir: &Path) -> Result<(), BuildError> {
        let pb = self.command(req, out_dir)?;
        tracing::debug!("running `{}`", pb.display_command());

        let output = pb.exec().map_err(|e| BuildError::Backend {
            backend: self.id().to_string(),
            artifact: req.spec.name.clone(),
            code: None,
            diagnostics: format!("{:#}", e),
        })?;

        if !output.status.success() {
            return Err(BuildError::Backend {
                backend: self.id().to_string(),
                artifact: req.spec.name.clone(),
                code: output.status.code(),
                diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }
}
