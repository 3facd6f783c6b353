//! Target platform identifiers.
//!
//! A platform is written `<arch>-<os>` (`x86_64-linux`, `aarch64-darwin`).
//! Everything produced for one platform stays with that platform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platforms evaluated when the manifest does not list its own.
pub const DEFAULT_PLATFORMS: &[&str] = &[
    "x86_64-linux",
    "aarch64-linux",
    "x86_64-darwin",
    "aarch64-darwin",
];

/// Error parsing a platform identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid platform `{0}`: expected `<arch>-<os>`, e.g. `x86_64-linux`")]
pub struct PlatformParseError(String);

/// A target system, e.g. `x86_64-linux`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform {
    arch: String,
    os: String,
}

impl Platform {
    /// The platform berth itself is running on.
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        Platform {
            arch: std::env::consts::ARCH.to_string(),
            os: os.to_string(),
        }
    }

    /// The default supported set.
    pub fn defaults() -> Vec<Platform> {
        DEFAULT_PLATFORMS
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect()
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn is_host(&self) -> bool {
        *self == Platform::host()
    }

    /// The rustc target triple for this platform, if berth knows one.
    pub fn rust_triple(&self) -> Option<String> {
        let triple = match (self.arch.as_str(), self.os.as_str()) {
            ("armv7l", "linux") => "armv7-unknown-linux-gnueabihf".to_string(),
            (arch, "linux") => format!("{}-unknown-linux-gnu", arch),
            (arch, "darwin") => format!("{}-apple-darwin", arch),
            (arch, "windows") => format!("{}-pc-windows-msvc", arch),
            (arch, "freebsd") => format!("{}-unknown-freebsd", arch),
            _ => return None,
        };
        Some(triple)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.arch, self.os)
    }
}

impl FromStr for Platform {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (arch, os) = s
            .split_once('-')
            .ok_or_else(|| PlatformParseError(s.to_string()))?;

        let valid = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        if !valid(arch) || !valid(os) {
            return Err(PlatformParseError(s.to_string()));
        }

        Ok(Platform {
            arch: arch.to_string(),
            os: os.to_string(),
        })
    }
}

impl TryFrom<String> for Platform {
    type Error = PlatformParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let p: Platform = "x86_64-linux".parse().unwrap();
        assert_eq!(p.arch(), "x86_64");
        assert_eq!(p.os(), "linux");
        assert_eq!(p.to_string(), "x86_64-linux");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("linux".parse::<Platform>().is_err());
        assert!("-linux".parse::<Platform>().is_err());
        assert!("x86_64-".parse::<Platform>().is_err());
        assert!("x86_64-unknown-linux".parse::<Platform>().is_err());
    }

    #[test]
    fn test_rust_triples() {
        let triple = |s: &str| s.parse::<Platform>().unwrap().rust_triple();
        assert_eq!(
            triple("x86_64-linux").as_deref(),
            Some("x86_64-unknown-linux-gnu")
        );
        assert_eq!(triple("aarch64-darwin").as_deref(), Some("aarch64-apple-darwin"));
        assert_eq!(
            triple("armv7l-linux").as_deref(),
            Some("armv7-unknown-linux-gnueabihf")
        );
        assert_eq!(triple("riscv64-plan9"), None);
    }

    #[test]
    fn test_defaults_parse() {
        let defaults = Platform::defaults();
        assert_eq!(defaults.len(), DEFAULT_PLATFORMS.len());
        assert!(defaults.iter().any(|p| p.to_string() == "aarch64-darwin"));
    }

    #[test]
    fn test_host_has_triple_on_common_systems() {
        let host = Platform::host();
        assert!(host.is_host());
        if cfg!(any(target_os = "linux", target_os = "macos")) {
            assert!(host.rust_triple().is_some());
        }
    }

    #[test]
    fn test_serde_as_string() {
        #[derive(Deserialize)]
        struct Doc {
            platforms: Vec<Platform>,
        }
        let doc: Doc = toml::from_str("platforms = [\"aarch64-linux\"]").unwrap();
        assert_eq!(doc.platforms[0].to_string(), "aarch64-linux");

        let bad: Result<Doc, _> = toml::from_str("platforms = [\"nope\"]");
        assert!(bad.is_err());
    }
}
