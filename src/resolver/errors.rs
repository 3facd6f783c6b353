//! Resolution error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error while resolving inputs.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ResolutionError {
    #[error("input `{name}` could not be located at `{locator}`: {reason}")]
    #[diagnostic(code(berth::resolve::not_found))]
    NotFound {
        name: String,
        locator: String,
        reason: String,
    },

    #[error("input `{name}` is declared twice: `{first}` and `{second}`")]
    #[diagnostic(code(berth::resolve::conflict))]
    Conflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("invalid locator `{locator}`: {reason}")]
    #[diagnostic(code(berth::resolve::invalid_locator))]
    InvalidLocator { locator: String, reason: String },

    #[error("no input named `{name}` to override")]
    #[diagnostic(code(berth::resolve::unknown_input))]
    UnknownInput { name: String },

    #[error("failed to fetch input `{name}` from `{url}`: {message}")]
    #[diagnostic(code(berth::resolve::fetch))]
    Fetch {
        name: String,
        url: String,
        message: String,
    },

    #[error("I/O error at {}: {source}", path.display())]
    #[diagnostic(code(berth::resolve::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResolutionError {
    /// Name of the input the error is about, if any.
    pub fn input_name(&self) -> Option<&str> {
        match self {
            ResolutionError::NotFound { name, .. }
            | ResolutionError::Conflict { name, .. }
            | ResolutionError::UnknownInput { name }
            | ResolutionError::Fetch { name, .. } => Some(name),
            ResolutionError::InvalidLocator { .. } | ResolutionError::Io { .. } => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolutionError::NotFound {
                name,
                locator,
                reason,
            } => Diagnostic::error(format!("could not resolve input `{}`", name))
                .with_context(format!("locator: {}", locator))
                .with_context(reason.clone())
                .with_suggestion("Check that the path or repository exists")
                .with_suggestion(format!(
                    "Point `{}` somewhere else with `--override-input {}@<locator>`",
                    name, name
                )),

            ResolutionError::Conflict {
                name,
                first,
                second,
            } => Diagnostic::error(format!("conflicting references for input `{}`", name))
                .with_context(format!("first:  {}", first))
                .with_context(format!("second: {}", second))
                .with_suggestion(format!("Keep a single reference for `{}`", name)),

            ResolutionError::InvalidLocator { locator, reason } => {
                Diagnostic::error(format!("invalid locator `{}`", locator))
                    .with_context(reason.clone())
                    .with_suggestion(
                        "Use `./dir`, `path:<dir>`, `github:<owner>/<repo>[/<ref>]` or `git+<url>`",
                    )
            }

            ResolutionError::UnknownInput { name } => {
                Diagnostic::error(format!("no input named `{}`", name))
                    .with_suggestion("Only inputs declared in [inputs] can be overridden")
            }

            ResolutionError::Fetch { name, url, message } => {
                Diagnostic::error(format!("failed to fetch input `{}`", name))
                    .with_context(format!("from {}", url))
                    .with_context(message.clone())
                    .with_suggestion(suggestions::FETCH_FAILED)
            }

            ResolutionError::Io { path, source } => {
                Diagnostic::error(format!("I/O error while resolving inputs: {}", source))
                    .with_location(path.clone())
            }
        }
    }
}
