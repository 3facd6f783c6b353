//! Execution profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where composed artifacts are assumed to live.
///
/// The profile only changes path strings, never what gets executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionProfile {
    /// Outputs of the artifact builder
    Packaged,
    /// A sibling project's `target/debug` tree
    LocalDebug,
    /// A sibling project's `target/release` tree
    LocalRelease,
}

impl ExecutionProfile {
    pub const ALL: [ExecutionProfile; 3] = [
        ExecutionProfile::Packaged,
        ExecutionProfile::LocalDebug,
        ExecutionProfile::LocalRelease,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionProfile::Packaged => "packaged",
            ExecutionProfile::LocalDebug => "local-debug",
            ExecutionProfile::LocalRelease => "local-release",
        }
    }

    pub fn is_local(&self) -> bool {
        !matches!(self, ExecutionProfile::Packaged)
    }

    /// Cargo's output directory name under `target/` for local profiles.
    pub fn target_subdir(&self) -> Option<&'static str> {
        match self {
            ExecutionProfile::Packaged => None,
            ExecutionProfile::LocalDebug => Some("debug"),
            ExecutionProfile::LocalRelease => Some("release"),
        }
    }
}

impl fmt::Display for ExecutionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "packaged" => Ok(ExecutionProfile::Packaged),
            "local-debug" | "debug" => Ok(ExecutionProfile::LocalDebug),
            "local-release" | "release" => Ok(ExecutionProfile::LocalRelease),
            _ => Err(format!(
                "invalid profile '{}'; expected 'packaged', 'local-debug', or 'local-release'",
                s
            )),
        }
    }
}
