//! Build-time tool environments.
//!
//! - [`PackageSet`] - tool name to executable mapping, extended by an
//!   [`Overlay`]
//! - [`ToolProvider`] - turns a package set into a per-platform [`Toolset`]
//! - [`Toolset`] - the located tools handed to the builder and the command
//!   runner
//!
//! ```ignore
//! let packages = PackageSet::base().overlay(&Overlay::from(&manifest.overlay));
//! let toolset = HostToolProvider.toolset(&platform, &packages)?;
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::manifest::OverlayDecl;
use crate::core::platform::Platform;
use crate::util::hash::Fingerprint;

/// Tools every project gets without declaring them.
const BASE_TOOLS: &[&str] = &["cargo", "rustc", "rustfmt", "git", "sh"];

/// Additions and replacements for the base package set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    tools: BTreeMap<String, String>,
}

impl Overlay {
    pub fn new() -> Self {
        Overlay::default()
    }

    pub fn with_tool(mut self, name: impl Into<String>, executable: impl Into<String>) -> Self {
        self.tools.insert(name.into(), executable.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl From<&OverlayDecl> for Overlay {
    fn from(decl: &OverlayDecl) -> Self {
        Overlay {
            tools: decl.tools.clone(),
        }
    }
}

/// Tool name to executable, before anything is located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSet {
    tools: BTreeMap<String, String>,
}

impl PackageSet {
    /// The base set: every base tool maps to an executable of the same name.
    pub fn base() -> Self {
        PackageSet {
            tools: BASE_TOOLS
                .iter()
                .map(|t| (t.to_string(), t.to_string()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        PackageSet {
            tools: BTreeMap::new(),
        }
    }

    /// Extend the set. Overlay entries win over existing ones.
    pub fn overlay(mut self, overlay: &Overlay) -> PackageSet {
        for (name, executable) in &overlay.tools {
            self.tools.insert(name.clone(), executable.clone());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tools.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tools.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Located tools for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolset {
    platform: Platform,
    tools: BTreeMap<String, PathBuf>,
}

impl Toolset {
    pub fn new(platform: Platform) -> Self {
        Toolset {
            platform,
            tools: BTreeMap::new(),
        }
    }

    pub fn with_tool(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(name.into(), path.into());
        self
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.tools.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tools from `required` that this set lacks, in the order given.
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .map(String::as_str)
            .filter(|t| !self.contains(t))
            .collect()
    }

    /// Directories holding the tools, deduplicated, in tool-name order.
    pub fn bin_dirs(&self) -> Vec<PathBuf> {
        let mut seen = BTreeSet::new();
        let mut dirs = Vec::new();
        for path in self.tools.values() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && seen.insert(parent.to_path_buf()) {
                    dirs.push(parent.to_path_buf());
                }
            }
        }
        dirs
    }

    /// Feed the identity of `tools` into a closure hash.
    ///
    /// Only names and the platform take part; tool locations differ between
    /// machines and must not change the hash.
    pub fn fingerprint_into(&self, fp: &mut Fingerprint, tools: &[String]) {
        fp.update_str(&self.platform.to_string());
        fp.update_strs(tools.iter().map(String::as_str));
    }
}

/// Produces the toolset for a platform.
pub trait ToolProvider {
    /// Provider name for display.
    fn name(&self) -> &str;

    /// Locate the tools of `packages` for `platform`. Tools that cannot be
    /// found are left out; the builder reports them when they are needed.
    fn toolset(&self, platform: &Platform, packages: &PackageSet) -> Result<Toolset>;
}

/// Locates tools on the host `PATH`.
///
/// Cross builds reuse the host tools; the cargo backend selects the target
/// through its target triple.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostToolProvider;

impl ToolProvider for HostToolProvider {
    fn name(&self) -> &str {
        "host"
    }

    fn toolset(&self, platform: &Platform, packages: &PackageSet) -> Result<Toolset> {
        let mut toolset = Toolset::new(platform.clone());
        for (name, executable) in packages.iter() {
            let candidate = Path::new(executable);
            let located = if candidate.components().count() > 1 || candidate.is_absolute() {
                candidate.is_file().then(|| candidate.to_path_buf())
            } else {
                which::which(executable).ok()
            };

            match located {
                Some(path) => {
                    tracing::debug!("tool `{}` -> {}", name, path.display());
                    toolset = toolset.with_tool(name, path);
                }
                None => tracing::debug!("tool `{}` ({}) not found", name, executable),
            }
        }
        Ok(toolset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        "x86_64-linux".parse().unwrap()
    }

    #[test]
    fn test_overlay_extends_and_replaces() {
        let overlay = Overlay::new()
            .with_tool("shellcheck", "shellcheck")
            .with_tool("cargo", "/opt/rust/bin/cargo");
        let packages = PackageSet::base().overlay(&overlay);

        assert_eq!(packages.get("shellcheck"), Some("shellcheck"));
        assert_eq!(packages.get("cargo"), Some("/opt/rust/bin/cargo"));
        assert_eq!(packages.get("rustc"), Some("rustc"));

        // The base set is left alone.
        assert_eq!(PackageSet::base().get("cargo"), Some("cargo"));
    }

    #[test]
    fn test_overlay_from_manifest_decl() {
        let mut decl = OverlayDecl::default();
        decl.tools.insert("rustfmt".into(), "rustfmt-nightly".into());
        let packages = PackageSet::empty().overlay(&Overlay::from(&decl));
        assert_eq!(packages.get("rustfmt"), Some("rustfmt-nightly"));
        assert_eq!(packages.get("cargo"), None);
    }

    #[test]
    fn test_missing_tools_keep_order() {
        let toolset = Toolset::new(linux()).with_tool("cargo", "/usr/bin/cargo");
        let required = vec!["rustc".to_string(), "cargo".to_string(), "make".to_string()];
        assert_eq!(toolset.missing(&required), vec!["rustc", "make"]);
    }

    #[test]
    fn test_bin_dirs_dedup() {
        let toolset = Toolset::new(linux())
            .with_tool("cargo", "/home/u/.cargo/bin/cargo")
            .with_tool("rustc", "/home/u/.cargo/bin/rustc")
            .with_tool("sh", "/bin/sh");
        assert_eq!(
            toolset.bin_dirs(),
            vec![PathBuf::from("/home/u/.cargo/bin"), PathBuf::from("/bin")]
        );
    }

    #[test]
    fn test_fingerprint_ignores_locations() {
        let tools = vec!["cargo".to_string()];
        let a = Toolset::new(linux()).with_tool("cargo", "/a/cargo");
        let b = Toolset::new(linux()).with_tool("cargo", "/b/cargo");

        let hash = |t: &Toolset| {
            let mut fp = Fingerprint::new();
            t.fingerprint_into(&mut fp, &tools);
            fp.finish()
        };
        assert_eq!(hash(&a), hash(&b));

        let other = Toolset::new("aarch64-linux".parse().unwrap());
        assert_ne!(hash(&a), hash(&other));
    }

    #[cfg(unix)]
    #[test]
    fn test_host_provider_finds_sh() {
        let packages = PackageSet::empty().overlay(
            &Overlay::new()
                .with_tool("sh", "sh")
                .with_tool("nope", "definitely-not-a-real-tool-xyz"),
        );
        let toolset = HostToolProvider.toolset(&linux(), &packages).unwrap();
        assert!(toolset.contains("sh"));
        assert!(!toolset.contains("nope"));
    }
}
