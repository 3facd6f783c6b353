//! Operator commands exposed by the development environment.

use std::fmt;

use serde::Serialize;

use crate::core::profile::ExecutionProfile;

/// What a command does when invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum Invocation {
    /// A literal `sh -c` command line run from the project root
    Shell(String),
    /// The composed wrapper for a profile
    Wrapper(ExecutionProfile),
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Shell(run) => f.write_str(run),
            Invocation::Wrapper(profile) => write!(f, "<wrapper: {}>", profile),
        }
    }
}

/// A named command with help text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub name: String,
    pub help: String,
    pub invocation: Invocation,
}

impl Command {
    pub fn shell(name: impl Into<String>, help: impl Into<String>, run: impl Into<String>) -> Self {
        Command {
            name: name.into(),
            help: help.into(),
            invocation: Invocation::Shell(run.into()),
        }
    }

    pub fn wrapper(
        name: impl Into<String>,
        help: impl Into<String>,
        profile: ExecutionProfile,
    ) -> Self {
        Command {
            name: name.into(),
            help: help.into(),
            invocation: Invocation::Wrapper(profile),
        }
    }
}
