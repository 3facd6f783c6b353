//! Build error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error while building an artifact.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BuildError {
    #[error("hash mismatch for artifact `{artifact}`: expected {expected}, got {actual}")]
    #[diagnostic(
        code(berth::build::hash_mismatch),
        help("the resolved sources changed; re-pin the hash only if the change is intended")
    )]
    HashMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    #[error("backend `{backend}` failed to build `{artifact}`")]
    #[diagnostic(code(berth::build::backend))]
    Backend {
        backend: String,
        artifact: String,
        code: Option<i32>,
        diagnostics: String,
    },

    #[error("artifact `{artifact}` needs tool(s) {} that are not available for {platform}", tools.join(", "))]
    #[diagnostic(code(berth::build::missing_tool))]
    MissingTool {
        artifact: String,
        tools: Vec<String>,
        platform: String,
    },

    #[error("backend `{backend}` cannot build `{artifact}` for {platform}")]
    #[diagnostic(code(berth::build::unsupported_platform))]
    UnsupportedPlatform {
        backend: String,
        artifact: String,
        platform: String,
    },

    #[error("I/O error while building `{artifact}` at {}: {message}", path.display())]
    #[diagnostic(code(berth::build::io))]
    Io {
        artifact: String,
        path: PathBuf,
        message: String,
    },
}

impl BuildError {
    pub(crate) fn io(artifact: &str, path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        BuildError::Io {
            artifact: artifact.to_string(),
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildError::HashMismatch {
                artifact,
                expected,
                actual,
            } => Diagnostic::error(format!("hash mismatch for artifact `{}`", artifact))
                .with_context(format!("pinned:     {}", expected))
                .with_context(format!("recomputed: {}", actual))
                .with_suggestion("Check which inputs changed since the hash was pinned")
                .with_suggestion(suggestions::UPDATE_HASH),

            BuildError::Backend {
                backend,
                artifact,
                code,
                diagnostics,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "failed to build `{}` with the {} backend",
                    artifact, backend
                ));
                if let Some(code) = code {
                    diag = diag.with_context(format!("exit code {}", code));
                }
                for line in diagnostics.lines().filter(|l| !l.trim().is_empty()) {
                    diag = diag.with_context(line.to_string());
                }
                diag.with_suggestion(suggestions::BUILD_FAILED)
            }

            BuildError::MissingTool {
                artifact,
                tools,
                platform,
            } => Diagnostic::error(format!("missing build tools for `{}`", artifact))
                .with_context(format!("platform: {}", platform))
                .with_context(format!("missing: {}", tools.join(", ")))
                .with_suggestion("Install the tools, or map them in [overlay.tools]"),

            BuildError::UnsupportedPlatform {
                backend,
                artifact,
                platform,
            } => Diagnostic::error(format!(
                "`{}` cannot be built for {} by the {} backend",
                artifact, platform, backend
            ))
            .with_suggestion("Remove the platform from [platforms] supported"),

            BuildError::Io {
                artifact,
                path,
                message,
            } => Diagnostic::error(format!("I/O error while building `{}`", artifact))
                .with_context(message.clone())
                .with_location(path.clone()),
        }
    }
}
