//! Berth.toml manifest parsing and schema.
//!
//! The manifest declares the project's external inputs, the artifacts built
//! from them, how the primary artifact is composed with its companion, and
//! the operator commands of the development environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::command::Command;
use crate::core::input::{validate_name, InputReference, Locator};
use crate::core::platform::Platform;
use crate::core::profile::ExecutionProfile;

/// Default name of the companion's data directory.
pub const DEFAULT_DATA_DIR: &str = "completion";

/// Tools every artifact needs unless it says otherwise.
pub const DEFAULT_TOOLS: [&str; 2] = ["cargo", "rustc"];

/// The parsed Berth.toml manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Project metadata
    pub project: ProjectMetadata,

    /// Named inputs, keyed by input name
    pub inputs: BTreeMap<String, InputReference>,

    /// Artifacts, keyed by artifact name
    pub artifacts: BTreeMap<String, ArtifactDecl>,

    /// Primary/companion composition
    pub compose: ComposeDecl,

    /// Supported platforms and per-platform input overrides
    pub platforms: PlatformsDecl,

    /// Operator commands in declaration-name order
    pub commands: Vec<Command>,

    /// Tool overlay applied on top of the base package set
    pub overlay: OverlayDecl,

    /// The directory containing this manifest
    pub manifest_dir: PathBuf,
}

/// Project metadata from the [project] section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// One `[artifacts.<name>]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ArtifactDecl {
    /// Input providing the source tree
    pub input: String,

    /// Executable name, defaults to the artifact name
    #[serde(default)]
    pub bin: Option<String>,

    /// Build-time tools, in order
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,

    /// Pinned closure hash
    #[serde(default)]
    pub hash: Option<String>,

    /// Source directories copied into the output root
    #[serde(default)]
    pub data: Vec<String>,

    /// Subdirectory of the input holding the crate
    #[serde(default)]
    pub subdir: Option<PathBuf>,
}

fn default_tools() -> Vec<String> {
    DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect()
}

/// The [compose] section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeDecl {
    /// Artifact whose executable the wrapper runs
    pub primary: String,

    /// Artifact providing the companion service
    pub companion: Option<String>,

    /// Explicit discovery variable name
    pub discovery_var: Option<String>,

    /// Sibling project directory for local profiles
    pub sibling: Option<PathBuf>,

    /// Companion data directory name
    pub data_dir: String,
}

/// The [platforms] section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformsDecl {
    pub supported: Vec<Platform>,
    pub input_overrides: BTreeMap<Platform, BTreeMap<String, InputReference>>,
}

impl PlatformsDecl {
    /// Input overrides for one platform.
    pub fn overrides_for(&self, platform: &Platform) -> Option<&BTreeMap<String, InputReference>> {
        self.input_overrides.get(platform)
    }
}

/// The [overlay] section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OverlayDecl {
    /// Tool name to executable (a name looked up on `PATH`, or a path)
    #[serde(default)]
    pub tools: BTreeMap<String, String>,
}

/// Raw manifest as deserialized from TOML.
#[derive(Debug, Deserialize)]
struct RawManifest {
    project: ProjectMetadata,

    #[serde(default)]
    inputs: BTreeMap<String, RawInput>,

    #[serde(default)]
    artifacts: BTreeMap<String, ArtifactDecl>,

    #[serde(default)]
    compose: RawCompose,

    #[serde(default)]
    platforms: RawPlatforms,

    #[serde(default)]
    commands: BTreeMap<String, RawCommand>,

    #[serde(default)]
    overlay: OverlayDecl,
}

/// An input is either a bare locator or a table with a pin.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawInput {
    Simple(String),
    Detailed {
        url: String,
        #[serde(default)]
        pin: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawCompose {
    #[serde(default)]
    primary: Option<String>,
    #[serde(default)]
    companion: Option<String>,
    #[serde(default)]
    discovery_var: Option<String>,
    #[serde(default)]
    sibling: Option<PathBuf>,
    #[serde(default)]
    data_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlatforms {
    #[serde(default)]
    supported: Option<Vec<Platform>>,

    /// `[platforms.<id>]` tables
    #[serde(flatten)]
    per_platform: BTreeMap<String, RawPlatformTable>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlatformTable {
    #[serde(default)]
    inputs: BTreeMap<String, RawInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCommand {
    #[serde(default)]
    help: Option<String>,
    #[serde(default)]
    run: Option<String>,
    #[serde(default)]
    wrapper: Option<ExecutionProfile>,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest =
            toml::from_str(content).with_context(|| "failed to parse Berth.toml")?;

        let manifest_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        if raw.project.name.trim().is_empty() {
            anyhow::bail!("manifest at {} has an empty project name", path.display());
        }

        let mut inputs = BTreeMap::new();
        for (name, raw_input) in raw.inputs {
            let reference = convert_input(&name, raw_input)?;
            inputs.insert(name, reference);
        }

        let compose = convert_compose(&raw.project.name, raw.compose, &raw.artifacts)?;
        let platforms = convert_platforms(raw.platforms, &inputs)?;

        let mut commands = Vec::new();
        for (name, raw_command) in raw.commands {
            commands.push(convert_command(name, raw_command)?);
        }

        let manifest = Manifest {
            project: raw.project,
            inputs,
            artifacts: raw.artifacts,
            compose,
            platforms,
            commands,
            overlay: raw.overlay,
            manifest_dir,
        };

        manifest.validate()?;
        Ok(manifest)
    }

    /// Cross-section checks that serde cannot express.
    fn validate(&self) -> Result<()> {
        if self.artifacts.is_empty() {
            anyhow::bail!("manifest declares no artifacts");
        }

        for (name, artifact) in &self.artifacts {
            validate_name(name).map_err(|reason| anyhow::anyhow!("artifact `{}`: {}", name, reason))?;

            if !self.inputs.contains_key(&artifact.input) {
                anyhow::bail!(
                    "artifact `{}` uses input `{}`, which is not declared in [inputs]",
                    name,
                    artifact.input
                );
            }

            if let Some(hash) = &artifact.hash {
                if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                    anyhow::bail!(
                        "artifact `{}`: hash must be a 64 character hex SHA-256, got `{}`",
                        name,
                        hash
                    );
                }
            }

            for dir in &artifact.data {
                let p = Path::new(dir);
                if dir.is_empty() || p.is_absolute() || dir.contains("..") {
                    anyhow::bail!(
                        "artifact `{}`: data directory `{}` must be a relative path inside the source",
                        name,
                        dir
                    );
                }
            }

            if artifact.tools.is_empty() {
                tracing::debug!("artifact `{}` declares no build tools", name);
            }
        }

        for (platform, overrides) in &self.platforms.input_overrides {
            if !self.platforms.supported.contains(platform) {
                tracing::warn!(
                    "[platforms.{}] overrides inputs for a platform that is not in `supported`",
                    platform
                );
            }
            for name in overrides.keys() {
                if !self.inputs.contains_key(name) {
                    anyhow::bail!(
                        "[platforms.{}.inputs] overrides unknown input `{}`",
                        platform,
                        name
                    );
                }
            }
        }

        Ok(())
    }

    /// Project name.
    pub fn name(&self) -> &str {
        &self.project.name
    }

    /// Look up an artifact declaration.
    pub fn artifact(&self, name: &str) -> Option<&ArtifactDecl> {
        self.artifacts.get(name)
    }

    /// Executable name of an artifact.
    pub fn bin_name<'a>(&'a self, artifact: &'a str) -> &'a str {
        self.artifacts
            .get(artifact)
            .and_then(|a| a.bin.as_deref())
            .unwrap_or(artifact)
    }

    /// The input feeding the companion artifact, if any.
    pub fn companion_input(&self) -> Option<&str> {
        let companion = self.compose.companion.as_deref()?;
        self.artifacts.get(companion).map(|a| a.input.as_str())
    }
}

fn convert_input(name: &str, raw: RawInput) -> Result<InputReference> {
    validate_name(name).map_err(|reason| anyhow::anyhow!("input `{}`: {}", name, reason))?;

    let (url, pin) = match raw {
        RawInput::Simple(url) => (url, None),
        RawInput::Detailed { url, pin } => (url, pin),
    };

    let locator = Locator::parse(&url).with_context(|| format!("input `{}`", name))?;
    let mut reference = InputReference::new(name, locator);
    if let Some(pin) = pin {
        reference = reference.with_pin(pin);
    }
    Ok(reference)
}

fn convert_compose(
    project: &str,
    raw: RawCompose,
    artifacts: &BTreeMap<String, ArtifactDecl>,
) -> Result<ComposeDecl> {
    // Without an explicit primary, pick the artifact named after the project
    // or the only artifact there is.
    let primary = match raw.primary {
        Some(primary) => primary,
        None if artifacts.contains_key(project) => project.to_string(),
        None if artifacts.len() == 1 => artifacts.keys().next().cloned().unwrap_or_default(),
        None => anyhow::bail!(
            "[compose] must name a `primary` artifact when the manifest declares several"
        ),
    };

    if !artifacts.contains_key(&primary) {
        anyhow::bail!("[compose] primary `{}` is not a declared artifact", primary);
    }

    if let Some(companion) = &raw.companion {
        if !artifacts.contains_key(companion) {
            anyhow::bail!("[compose] companion `{}` is not a declared artifact", companion);
        }
        if *companion == primary {
            anyhow::bail!("[compose] companion must differ from the primary artifact");
        }
    }

    Ok(ComposeDecl {
        primary,
        companion: raw.companion,
        discovery_var: raw.discovery_var,
        sibling: raw.sibling,
        data_dir: raw.data_dir.unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
    })
}

fn convert_platforms(
    raw: RawPlatforms,
    inputs: &BTreeMap<String, InputReference>,
) -> Result<PlatformsDecl> {
    let supported = match raw.supported {
        Some(list) if list.is_empty() => anyhow::bail!("[platforms] supported list is empty"),
        Some(list) => {
            let mut deduped: Vec<Platform> = Vec::with_capacity(list.len());
            for platform in list {
                if !deduped.contains(&platform) {
                    deduped.push(platform);
                }
            }
            deduped
        }
        None => Platform::defaults(),
    };

    let mut input_overrides = BTreeMap::new();
    for (key, table) in raw.per_platform {
        let platform: Platform = key
            .parse()
            .with_context(|| format!("invalid platform table [platforms.{}]", key))?;

        let mut overrides = BTreeMap::new();
        for (name, raw_input) in table.inputs {
            let mut reference = convert_input(&name, raw_input)
                .with_context(|| format!("in [platforms.{}.inputs]", platform))?;
            // An override without its own pin keeps the base input's pin only
            // when the locator is unchanged.
            if reference.pin.is_none() {
                if let Some(base) = inputs.get(&name) {
                    if base.locator == reference.locator {
                        reference.pin = base.pin.clone();
                    }
                }
            }
            overrides.insert(name, reference);
        }
        input_overrides.insert(platform, overrides);
    }

    Ok(PlatformsDecl {
        supported,
        input_overrides,
    })
}

fn convert_command(name: String, raw: RawCommand) -> Result<Command> {
    validate_name(&name).map_err(|reason| anyhow::anyhow!("command `{}`: {}", name, reason))?;

    let help = raw.help.unwrap_or_default();
    match (raw.run, raw.wrapper) {
        (Some(run), None) => {
            if run.trim().is_empty() {
                anyhow::bail!("command `{}` has an empty `run`", name);
            }
            Ok(Command::shell(name, help, run))
        }
        (None, Some(profile)) => Ok(Command::wrapper(name, help, profile)),
        (Some(_), Some(_)) => {
            anyhow::bail!("command `{}` sets both `run` and `wrapper`; pick one", name)
        }
        (None, None) => anyhow::bail!("command `{}` needs either `run` or `wrapper`", name),
    }
}

/// Generate the manifest written for a new project.
pub fn generate_default_manifest(name: &str) -> String {
    format!(
        r#"[project]
name = "{name}"

[inputs]
{name} = "./."

[artifacts.{name}]
input = "{name}"
tools = ["cargo", "rustc"]

[compose]
primary = "{name}"
"#
    )
}
