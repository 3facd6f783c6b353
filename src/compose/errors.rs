//! Composition error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::profile::ExecutionProfile;
use crate::util::diagnostic::Diagnostic;

/// Error while composing a wrapper.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum CompositionError {
    #[error("{location} location `{artifact}` cannot be used with the `{profile}` profile")]
    #[diagnostic(
        code(berth::compose::profile_mismatch),
        help("built artifacts go with `packaged`, templates with the matching local profile")
    )]
    ProfileMismatch {
        artifact: String,
        location: String,
        profile: ExecutionProfile,
    },

    #[error("invalid wrapper command `{command}`: expected a bare executable name")]
    #[diagnostic(code(berth::compose::invalid_command))]
    InvalidCommand { command: String },

    #[error("invalid discovery variable name `{name}`")]
    #[diagnostic(code(berth::compose::invalid_variable))]
    InvalidVariable { name: String },

    #[error("discovery variable `{name}` is set but no companion is configured")]
    #[diagnostic(code(berth::compose::discovery_without_companion))]
    DiscoveryWithoutCompanion { name: String },

    #[error("artifact `{name}` is not available for composition")]
    #[diagnostic(code(berth::compose::missing_artifact))]
    MissingArtifact { name: String },
}

impl CompositionError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CompositionError::ProfileMismatch {
                artifact,
                location,
                profile,
            } => Diagnostic::error(format!(
                "cannot compose `{}` for the `{}` profile",
                artifact, profile
            ))
            .with_context(format!("location kind: {}", location))
            .with_suggestion("Use `--profile packaged` for built artifacts")
            .with_suggestion("Use a local profile for sibling working trees"),

            CompositionError::InvalidCommand { command } => {
                let shown = if command.is_empty() { "<empty>" } else { command.as_str() };
                Diagnostic::error("the wrapper command must be an executable name")
                    .with_context(format!("got: {}", shown))
                    .with_suggestion("Set `bin` on the primary artifact to a name without slashes")
            }

            CompositionError::InvalidVariable { name } => {
                Diagnostic::error(format!("`{}` is not a valid environment variable name", name))
                    .with_suggestion("Use letters, digits and underscores, not starting with a digit")
            }

            CompositionError::DiscoveryWithoutCompanion { name } => Diagnostic::error(format!(
                "discovery variable `{}` needs a companion",
                name
            ))
            .with_suggestion("Add `companion` to [compose], or drop `discovery-var`"),

            CompositionError::MissingArtifact { name } => {
                Diagnostic::error(format!("artifact `{}` was not built", name))
                    .with_suggestion("Run `berth build` first, or evaluate without --no-build")
            }
        }
    }
}
