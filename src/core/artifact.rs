//! Artifact specifications and build outputs.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Everything needed to build one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Artifact name, unique within the manifest
    pub name: String,

    /// Source directory handed to the backend
    pub source: PathBuf,

    /// Build-time tools, in declaration order
    pub tools: Vec<String>,

    /// Pinned closure hash, checked before anything is built
    pub hash: Option<String>,

    /// Executable the artifact provides under `bin/`
    pub bin: String,

    /// Auxiliary source directories copied into the output root
    pub data: Vec<String>,
}

impl ArtifactSpec {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        let name = name.into();
        ArtifactSpec {
            bin: name.clone(),
            name,
            source: source.into(),
            tools: Vec::new(),
            hash: None,
            data: Vec::new(),
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn with_bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = bin.into();
        self
    }

    pub fn with_data<I, S>(mut self, data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data = data.into_iter().map(Into::into).collect();
        self
    }
}

/// A finished build output.
///
/// Rooted in the artifact store; downstream composition only ever refers to
/// it by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltArtifact {
    name: String,
    root: PathBuf,
    content_hash: String,
    bin: String,
}

impl BuiltArtifact {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        content_hash: impl Into<String>,
        bin: impl Into<String>,
    ) -> Self {
        BuiltArtifact {
            name: name.into(),
            root: root.into(),
            content_hash: content_hash.into(),
            bin: bin.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Directory holding the artifact's executables.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Auxiliary data directory, e.g. `completion`.
    pub fn data_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Full path of the artifact's main executable.
    pub fn executable(&self) -> PathBuf {
        self.bin_dir()
            .join(format!("{}{}", self.bin, std::env::consts::EXE_SUFFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults_bin_to_name() {
        let spec = ArtifactSpec::new("shellac", "/src/shellac")
            .with_tools(["cargo", "rustc"])
            .with_data(["completion"]);
        assert_eq!(spec.bin, "shellac");
        assert_eq!(spec.tools, vec!["cargo", "rustc"]);
        assert_eq!(spec.data, vec!["completion"]);
        assert!(spec.hash.is_none());
    }

    #[test]
    fn test_built_artifact_layout() {
        let built = BuiltArtifact::new("shellac", "/store/abc-shellac", "abc", "shellac");
        assert_eq!(built.bin_dir(), PathBuf::from("/store/abc-shellac/bin"));
        assert_eq!(
            built.data_dir("completion"),
            PathBuf::from("/store/abc-shellac/completion")
        );
        assert!(built.executable().starts_with("/store/abc-shellac/bin"));
    }
}
