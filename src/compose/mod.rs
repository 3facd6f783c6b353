//! Environment composition.
//!
//! Turns a primary artifact, an optional companion and an execution profile
//! into a [`ComposedWrapper`]. Composition is a pure function of its
//! arguments: it never touches the filesystem or the process environment.
//! The caller's `PATH` only comes in when a wrapper is applied.

pub mod errors;

pub use errors::CompositionError;

use std::path::{Path, PathBuf};

use crate::core::artifact::BuiltArtifact;
use crate::core::manifest::Manifest;
use crate::core::profile::ExecutionProfile;
use crate::core::wrapper::{ComposedWrapper, Discovery};
use crate::util::config::Config;
use crate::util::fs::absolutize;

/// Discovery variable name used when nothing else is configured.
pub const DEFAULT_DISCOVERY_VAR: &str = "COMPLETION_DIR";

/// A project directory interpreted under a local profile.
///
/// Nothing about a template is checked on disk; a missing directory shows
/// up when the wrapper runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    dir: PathBuf,
    profile: ExecutionProfile,
    bin: String,
}

impl PathTemplate {
    pub fn new(dir: impl Into<PathBuf>, profile: ExecutionProfile, bin: impl Into<String>) -> Self {
        PathTemplate {
            dir: dir.into(),
            profile,
            bin: bin.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn profile(&self) -> ExecutionProfile {
        self.profile
    }

    /// `<dir>/target/<debug|release>`, or `None` for `packaged`.
    pub fn bin_segment(&self) -> Option<PathBuf> {
        self.profile
            .target_subdir()
            .map(|sub| self.dir.join("target").join(sub))
    }

    pub fn data_segment(&self, data_dir: &str) -> PathBuf {
        self.dir.join(data_dir)
    }
}

/// Where an artifact lives for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Built(BuiltArtifact),
    Template(PathTemplate),
}

impl Location {
    fn kind(&self) -> &'static str {
        match self {
            Location::Built(_) => "built",
            Location::Template(_) => "template",
        }
    }

    fn label(&self) -> String {
        match self {
            Location::Built(built) => built.name().to_string(),
            Location::Template(template) => template.dir.display().to_string(),
        }
    }

    /// Executable name provided by the location.
    pub fn bin(&self) -> &str {
        match self {
            Location::Built(built) => built.bin(),
            Location::Template(template) => &template.bin,
        }
    }

    /// Search path segment for `profile`, if the location fits it.
    fn bin_segment(&self, profile: ExecutionProfile) -> Result<PathBuf, CompositionError> {
        let segment = match self {
            Location::Built(built) if profile == ExecutionProfile::Packaged => Some(built.bin_dir()),
            Location::Template(template) if template.profile == profile => template.bin_segment(),
            _ => None,
        };
        segment.ok_or_else(|| CompositionError::ProfileMismatch {
            artifact: self.label(),
            location: self.kind().to_string(),
            profile,
        })
    }

    fn data_segment(&self, data_dir: &str) -> PathBuf {
        match self {
            Location::Built(built) => built.data_dir(data_dir),
            Location::Template(template) => template.data_segment(data_dir),
        }
    }
}

/// Knobs for [`compose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Explicit discovery variable name; `None` uses [`DEFAULT_DISCOVERY_VAR`]
    pub discovery_var: Option<String>,

    /// Companion data directory exported through the discovery variable
    pub data_dir: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            discovery_var: None,
            data_dir: crate::core::manifest::DEFAULT_DATA_DIR.to_string(),
        }
    }
}

impl ComposeOptions {
    pub fn discovery_var(&self) -> &str {
        self.discovery_var.as_deref().unwrap_or(DEFAULT_DISCOVERY_VAR)
    }
}

/// Compose the wrapper for one profile.
///
/// The companion's segment always comes first on the search path, and the
/// discovery variable exists exactly when a companion does.
pub fn compose(
    profile: ExecutionProfile,
    primary: &Location,
    companion: Option<&Location>,
    options: &ComposeOptions,
) -> Result<ComposedWrapper, CompositionError> {
    let command = primary.bin();
    if !is_bare_command(command) {
        return Err(CompositionError::InvalidCommand {
            command: command.to_string(),
        });
    }

    let var = options.discovery_var();
    if !is_valid_variable(var) {
        return Err(CompositionError::InvalidVariable {
            name: var.to_string(),
        });
    }

    let mut search_path = Vec::with_capacity(2);
    let discovery = match companion {
        Some(companion) => {
            search_path.push(companion.bin_segment(profile)?);
            Some(Discovery {
                name: var.to_string(),
                value: companion.data_segment(&options.data_dir),
            })
        }
        None => {
            if let Some(name) = &options.discovery_var {
                return Err(CompositionError::DiscoveryWithoutCompanion { name: name.clone() });
            }
            None
        }
    };
    search_path.push(primary.bin_segment(profile)?);

    Ok(ComposedWrapper::new(
        profile,
        search_path,
        discovery,
        command.to_string(),
    ))
}

fn is_bare_command(command: &str) -> bool {
    !command.trim().is_empty()
        && !command.contains(['/', '\\'])
        && command != "."
        && command != ".."
}

fn is_valid_variable(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Composition settings of a project, after layering configuration.
///
/// The companion's sibling directory is picked from, highest first: the
/// command line or `BERTH_SIBLING_DIR`, the merged config files, the
/// manifest's `compose.sibling`, and `../<companion input>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeSettings {
    /// Companion project directory, relative to the project root when possible
    pub sibling: Option<PathBuf>,
    pub options: ComposeOptions,
}

impl ComposeSettings {
    /// `root` is the project root; `cwd` anchors a relative `sibling_override`.
    pub fn from_manifest(
        manifest: &Manifest,
        config: &Config,
        sibling_override: Option<&Path>,
        root: &Path,
        cwd: &Path,
    ) -> ComposeSettings {
        let has_companion = manifest.compose.companion.is_some();

        let sibling = if has_companion {
            let chosen = match (sibling_override, &config.compose.sibling, &manifest.compose.sibling) {
                (Some(dir), _, _) => Some(relative_to(root, &absolutize(cwd, dir))),
                (None, Some(dir), _) | (None, None, Some(dir)) => Some(relative_to(root, dir)),
                (None, None, None) => manifest
                    .companion_input()
                    .map(|input| Path::new("..").join(input)),
            };
            tracing::debug!("companion sibling directory: {:?}", chosen);
            chosen
        } else {
            None
        };

        // A config-wide variable name only matters for projects with a
        // companion; the manifest's own setting is always honoured so a
        // stray one is reported.
        let discovery_var = manifest.compose.discovery_var.clone().or_else(|| {
            if has_companion {
                config.compose.discovery_var.clone()
            } else {
                None
            }
        });

        ComposeSettings {
            sibling,
            options: ComposeOptions {
                discovery_var,
                data_dir: manifest.compose.data_dir.clone(),
            },
        }
    }

    /// Template locations of the primary and companion for a local profile.
    pub fn templates(
        &self,
        manifest: &Manifest,
        profile: ExecutionProfile,
    ) -> (Location, Option<Location>) {
        let primary = Location::Template(PathTemplate::new(
            ".",
            profile,
            manifest.bin_name(&manifest.compose.primary),
        ));
        let companion = manifest
            .compose
            .companion
            .as_deref()
            .zip(self.sibling.as_ref())
            .map(|(name, dir)| {
                Location::Template(PathTemplate::new(dir, profile, manifest.bin_name(name)))
            });
        (primary, companion)
    }
}

/// `path` relative to `root` if both are absolute, otherwise unchanged.
fn relative_to(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() && root.is_absolute() {
        pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}
