//! Lockfile encoding and decoding.
//!
//! Berth.lock records the commit every git input resolved to, per platform
//! when a platform overrides the input.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::input::{InputReference, ResolvedInput};
use crate::core::platform::Platform;
use crate::util::fs::write_string;

/// Current lockfile format version.
pub const LOCKFILE_VERSION: u32 = 1;

/// Lockfile representation for serialization.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Lockfile {
    /// Lockfile format version
    pub version: u32,

    /// Hash of the manifest's input-affecting fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_hash: Option<String>,

    /// Locked inputs
    #[serde(rename = "input", default)]
    pub inputs: Vec<LockedInput>,
}

/// A locked git input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedInput {
    /// Input name
    pub name: String,

    /// Locator the revision was resolved from
    pub source: String,

    /// Full commit id
    pub rev: String,

    /// Set when the entry belongs to a per-platform override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl Lockfile {
    pub fn new() -> Self {
        Lockfile {
            version: LOCKFILE_VERSION,
            ..Default::default()
        }
    }

    pub fn with_manifest_hash(mut self, hash: String) -> Self {
        self.manifest_hash = Some(hash);
        self
    }

    pub fn manifest_hash(&self) -> Option<&str> {
        self.manifest_hash.as_deref()
    }

    /// Record a resolved input. Path inputs carry no revision and are
    /// skipped; identical entries are stored once.
    pub fn record(&mut self, input: &ResolvedInput, platform: Option<&Platform>) {
        let Some(rev) = &input.revision else {
            return;
        };
        let entry = LockedInput {
            name: input.reference.name.clone(),
            source: input.reference.locator.to_string(),
            rev: rev.clone(),
            platform: platform.cloned(),
        };
        if !self.inputs.contains(&entry) {
            self.inputs.push(entry);
        }
    }

    /// Sort entries so the file is stable across runs.
    pub fn normalize(&mut self) {
        self.inputs.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.platform.cmp(&b.platform))
                .then_with(|| a.source.cmp(&b.source))
        });
        self.inputs.dedup();
    }

    /// The locked revision for a reference, preferring a platform-specific
    /// entry. Entries for a different locator are ignored.
    pub fn pin_for(&self, reference: &InputReference, platform: &Platform) -> Option<&str> {
        let source = reference.locator.to_string();
        let matching = |entry: &&LockedInput| entry.name == reference.name && entry.source == source;

        self.inputs
            .iter()
            .filter(matching)
            .find(|entry| entry.platform.as_ref() == Some(platform))
            .or_else(|| {
                self.inputs
                    .iter()
                    .filter(matching)
                    .find(|entry| entry.platform.is_none())
            })
            .map(|entry| entry.rev.as_str())
    }

    /// Load a lockfile from a path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lockfile: {}", path.display()))?;

        toml::from_str(&content).with_context(|| "failed to parse lockfile")
    }

    /// Save the lockfile to a path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        let with_header = format!(
            "# This file is automatically generated by berth.\n\
             # It is not intended for manual editing.\n\n\
             {content}"
        );

        write_string(path, &with_header)
            .with_context(|| format!("failed to write lockfile: {}", path.display()))
    }

    pub fn is_compatible(&self) -> bool {
        self.version == LOCKFILE_VERSION
    }
}
