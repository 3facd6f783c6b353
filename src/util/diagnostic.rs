//! User-friendly diagnostic messages.
//!
//! Every fatal error carries its root cause, the conflicting values and a
//! suggested fix. Domain errors convert into a [`Diagnostic`] for terminal
//! output, and [`exit_code`] maps them onto the process exit status.

use std::fmt;
use std::path::PathBuf;

use crate::builder::BuildError;
use crate::compose::CompositionError;
use crate::ops::evaluate::EvalError;
use crate::resolver::ResolutionError;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no manifest file is found.
    pub const NO_MANIFEST: &str = "help: Create a `Berth.toml` at the project root";

    /// Suggestion when a pinned hash no longer matches.
    pub const UPDATE_HASH: &str =
        "If the change is intended, replace the pinned `hash` with the new value";

    /// Suggestion when the build backend fails.
    pub const BUILD_FAILED: &str = "help: Run `berth build --verbose` for more details";

    /// Suggestion for fetch failures.
    pub const FETCH_FAILED: &str =
        "Check your network connection, or drop `--offline` to allow fetching";
}

/// Process exit codes.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const RESOLUTION: i32 = 2;
    pub const BUILD: i32 = 3;
    pub const COMPOSITION: i32 = 4;
    pub const PLATFORMS_FAILED: i32 = 5;
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  -> {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

/// Find the first domain error in an error chain and turn it into a
/// diagnostic. Errors without a domain cause render as their chain.
pub fn to_diagnostic(err: &anyhow::Error) -> Diagnostic {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<EvalError>() {
            return e.to_diagnostic();
        }
        if let Some(e) = cause.downcast_ref::<ResolutionError>() {
            return e.to_diagnostic();
        }
        if let Some(e) = cause.downcast_ref::<BuildError>() {
            return e.to_diagnostic();
        }
        if let Some(e) = cause.downcast_ref::<CompositionError>() {
            return e.to_diagnostic();
        }
    }
    Diagnostic::error(format!("{:#}", err))
}

/// Map an error onto the process exit code.
///
/// Resolution, build and composition failures each get a distinct code so
/// scripts can tell them apart from a generic failure.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<EvalError>() {
            return e.exit_code();
        }
        if cause.is::<ResolutionError>() {
            return exit::RESOLUTION;
        }
        if cause.is::<BuildError>() {
            return exit::BUILD;
        }
        if cause.is::<CompositionError>() {
            return exit::COMPOSITION;
        }
    }
    exit::FAILURE
}
