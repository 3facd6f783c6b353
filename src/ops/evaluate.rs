//! Per-platform evaluation.
//!
//! For every selected platform: resolve inputs, build artifacts, compose a
//! wrapper per profile and assemble the command registry. Platforms are
//! independent; one failing never stops the others.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use thiserror::Error;

use crate::builder::{
    BuildBackend, BuildError, CargoBackend, Freshness, HostToolProvider, Overlay, PackageSet,
    ToolProvider, Toolset,
};
use crate::compose::{compose, ComposeSettings, CompositionError, Location};
use crate::core::artifact::BuiltArtifact;
use crate::core::input::{InputReference, ResolvedInputs};
use crate::core::platform::Platform;
use crate::core::profile::ExecutionProfile;
use crate::core::project::Project;
use crate::core::wrapper::ComposedWrapper;
use crate::ops::berth_build::build_platform;
use crate::registry::{CommandRegistry, RegistryBuilder};
use crate::resolver::{InputResolver, ResolutionError};
use crate::sources::SourceCache;
use crate::util::config::Config;
use crate::util::context::{default_store_dir, GlobalContext};
use crate::util::diagnostic::{self, exit, Diagnostic};

/// Everything shared by the platforms of one evaluation.
///
/// The package set is extended by the manifest's overlay once, here; every
/// platform's toolset is derived from the same set.
pub struct EvalContext<'a> {
    project: &'a Project,
    compose: ComposeSettings,
    packages: PackageSet,
    store_dir: PathBuf,
    cache_dir: PathBuf,
    offline: bool,
    jobs: Option<usize>,
    overrides: Vec<InputReference>,
    backend: Box<dyn BuildBackend>,
    tools: Box<dyn ToolProvider>,
}

impl<'a> EvalContext<'a> {
    /// Context with the cargo backend and host tools.
    ///
    /// `sibling_override` comes from `--sibling-dir` or `BERTH_SIBLING_DIR`.
    pub fn new(
        project: &'a Project,
        gctx: &GlobalContext,
        config: &Config,
        sibling_override: Option<&Path>,
    ) -> Self {
        let root = project.root();
        let store_dir = match &config.build.store_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => default_store_dir(root),
        };

        EvalContext {
            project,
            compose: ComposeSettings::from_manifest(
                project.manifest(),
                config,
                sibling_override,
                root,
                gctx.cwd(),
            ),
            packages: PackageSet::base().overlay(&Overlay::from(&project.manifest().overlay)),
            store_dir,
            cache_dir: gctx.cache_dir().to_path_buf(),
            offline: config.net.offline,
            jobs: config.build.jobs,
            overrides: Vec::new(),
            backend: Box::new(CargoBackend::new()),
            tools: Box::new(HostToolProvider),
        }
    }

    pub fn with_backend(mut self, backend: impl BuildBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn with_tool_provider(mut self, tools: impl ToolProvider + 'static) -> Self {
        self.tools = Box::new(tools);
        self
    }

    /// `--override-input` references, replacing manifest inputs by name.
    pub fn with_overrides(mut self, overrides: Vec<InputReference>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_store_dir(mut self, store_dir: impl Into<PathBuf>) -> Self {
        self.store_dir = store_dir.into();
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        if jobs.is_some() {
            self.jobs = jobs;
        }
        self
    }

    /// Forbid network access; only cached git inputs resolve.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline |= offline;
        self
    }

    pub fn project(&self) -> &Project {
        self.project
    }

    /// Where git inputs are checked out.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn packages(&self) -> &PackageSet {
        &self.packages
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }

    pub fn overrides(&self) -> &[InputReference] {
        &self.overrides
    }

    pub fn backend(&self) -> &dyn BuildBackend {
        self.backend.as_ref()
    }

    /// A fresh resolver; snapshots are shared across the platforms it serves.
    pub fn resolver(&self) -> InputResolver {
        InputResolver::new(
            SourceCache::new(self.cache_dir.clone(), self.project.root().to_path_buf())
                .offline(self.offline),
        )
    }

    /// Resolve the inputs of one platform.
    pub fn resolve(
        &self,
        resolver: &mut InputResolver,
        platform: &Platform,
    ) -> Result<ResolvedInputs, ResolutionError> {
        let refs = self.project.references(platform, &self.overrides)?;
        resolver.resolve(&refs)
    }

    pub fn toolset(&self, platform: &Platform) -> Result<Toolset> {
        tracing::debug!("locating tools for {} with {}", platform, self.tools.name());
        self.tools.toolset(platform, &self.packages)
    }

    /// Compose a local profile's wrapper from directory templates.
    pub fn compose_local(&self, profile: ExecutionProfile) -> Result<ComposedWrapper, CompositionError> {
        let (primary, companion) = self.compose.templates(self.project.manifest(), profile);
        compose(profile, &primary, companion.as_ref(), &self.compose.options)
    }

    /// Compose the packaged wrapper from built artifacts, keyed by name.
    pub fn compose_packaged(
        &self,
        built: &BTreeMap<String, BuiltArtifact>,
    ) -> Result<ComposedWrapper, CompositionError> {
        let decl = &self.project.manifest().compose;
        let lookup = |name: &str| {
            built
                .get(name)
                .cloned()
                .map(Location::Built)
                .ok_or_else(|| CompositionError::MissingArtifact {
                    name: name.to_string(),
                })
        };

        let primary = lookup(&decl.primary)?;
        let companion = decl.companion.as_deref().map(lookup).transpose()?;
        compose(
            ExecutionProfile::Packaged,
            &primary,
            companion.as_ref(),
            &self.compose.options,
        )
    }
}

/// What to evaluate.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Platforms to evaluate, in order
    pub platforms: Vec<Platform>,

    /// Build artifacts and compose the packaged wrapper
    pub build: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            platforms: Vec::new(),
            build: true,
        }
    }
}

/// Pick the platforms to work on.
///
/// Without `requested` platforms this is the host when `all` is false, or
/// every supported platform. Requested platforms must be supported.
pub fn select_platforms(project: &Project, requested: &[Platform], all: bool) -> Result<Vec<Platform>> {
    let supported = &project.manifest().platforms.supported;

    if !requested.is_empty() {
        for platform in requested {
            if !supported.contains(platform) {
                bail!(
                    "platform `{}` is not supported by this project\n\
                     supported platforms: {}",
                    platform,
                    supported
                        .iter()
                        .map(Platform::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        return Ok(dedup_in_order(requested));
    }

    if all {
        return Ok(supported.clone());
    }

    let host = Platform::host();
    if !supported.contains(&host) {
        bail!(
            "the host platform `{}` is not in [platforms] supported\n\
             hint: pass --platform or --all-platforms",
            host
        );
    }
    Ok(vec![host])
}

/// `items` without repeats, keeping the first occurrence of each.
pub(crate) fn dedup_in_order<T: Clone + Eq + std::hash::Hash>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

/// Failure of one platform.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EvalError {
    pub fn exit_code(&self) -> i32 {
        match self {
            EvalError::Resolution(_) => exit::RESOLUTION,
            EvalError::Build(_) => exit::BUILD,
            EvalError::Composition(_) => exit::COMPOSITION,
            EvalError::Other(e) => diagnostic::exit_code(e),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EvalError::Resolution(e) => e.to_diagnostic(),
            EvalError::Build(e) => e.to_diagnostic(),
            EvalError::Composition(e) => e.to_diagnostic(),
            EvalError::Other(e) => diagnostic::to_diagnostic(e),
        }
    }
}

/// A built artifact and whether the backend had to run for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOutput {
    pub artifact: BuiltArtifact,
    pub freshness: Freshness,
}

/// Everything one platform produced.
#[derive(Debug, Clone)]
pub struct PlatformOutputs {
    pub platform: Platform,
    pub inputs: ResolvedInputs,
    pub artifacts: BTreeMap<String, ArtifactOutput>,
    pub wrappers: BTreeMap<ExecutionProfile, ComposedWrapper>,
    pub registry: CommandRegistry,
}

impl PlatformOutputs {
    pub fn wrapper(&self, profile: ExecutionProfile) -> Option<&ComposedWrapper> {
        self.wrappers.get(&profile)
    }

    fn to_json(&self) -> serde_json::Value {
        let inputs: serde_json::Map<_, _> = self
            .inputs
            .iter()
            .map(|input| {
                (
                    input.reference.name.clone(),
                    serde_json::json!({
                        "locator": input.reference.locator.to_string(),
                        "path": input.path,
                        "revision": input.revision,
                    }),
                )
            })
            .collect();

        let artifacts: serde_json::Map<_, _> = self
            .artifacts
            .iter()
            .map(|(name, output)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "root": output.artifact.root(),
                        "content_hash": output.artifact.content_hash(),
                        "fresh": output.freshness == Freshness::Fresh,
                    }),
                )
            })
            .collect();

        let wrappers: serde_json::Map<_, _> = self
            .wrappers
            .iter()
            .map(|(profile, wrapper)| {
                (
                    profile.to_string(),
                    serde_json::to_value(wrapper).unwrap_or(serde_json::Value::Null),
                )
            })
            .collect();

        serde_json::json!({
            "platform": self.platform.to_string(),
            "status": "ok",
            "inputs": inputs,
            "artifacts": artifacts,
            "wrappers": wrappers,
            "commands": self.registry.iter().collect::<Vec<_>>(),
        })
    }
}

/// Outcome of one platform.
#[derive(Debug)]
pub struct PlatformResult {
    pub platform: Platform,
    pub outcome: Result<PlatformOutputs, EvalError>,
}

/// Results of every evaluated platform, in evaluation order.
#[derive(Debug, Default)]
pub struct Evaluation {
    pub platforms: Vec<PlatformResult>,
}

impl Evaluation {
    pub fn get(&self, platform: &Platform) -> Option<&Result<PlatformOutputs, EvalError>> {
        self.platforms
            .iter()
            .find(|r| &r.platform == platform)
            .map(|r| &r.outcome)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &PlatformOutputs> {
        self.platforms.iter().filter_map(|r| r.outcome.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Platform, &EvalError)> {
        self.platforms
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (&r.platform, e)))
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    /// `0` when every platform succeeded, otherwise the platforms-failed code.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            exit::SUCCESS
        } else {
            exit::PLATFORMS_FAILED
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let platforms: Vec<_> = self
            .platforms
            .iter()
            .map(|r| match &r.outcome {
                Ok(outputs) => outputs.to_json(),
                Err(e) => serde_json::json!({
                    "platform": r.platform.to_string(),
                    "status": "failed",
                    "exit_code": e.exit_code(),
                    "error": e.to_string(),
                }),
            })
            .collect();

        serde_json::json!({
            "success": self.is_success(),
            "platforms": platforms,
        })
    }
}

/// Evaluate every platform in `opts`.
pub fn evaluate(cx: &EvalContext<'_>, opts: &EvalOptions) -> Evaluation {
    let mut resolver = cx.resolver();
    let mut evaluation = Evaluation::default();

    for platform in &opts.platforms {
        let outcome = evaluate_platform(cx, &mut resolver, platform, opts);
        match &outcome {
            Ok(_) => tracing::info!("{}: ok", platform),
            Err(e) => tracing::warn!("{}: {}", platform, e),
        }
        evaluation.platforms.push(PlatformResult {
            platform: platform.clone(),
            outcome,
        });
    }

    evaluation
}

fn evaluate_platform(
    cx: &EvalContext<'_>,
    resolver: &mut InputResolver,
    platform: &Platform,
    opts: &EvalOptions,
) -> Result<PlatformOutputs, EvalError> {
    let inputs = cx.resolve(resolver, platform)?;
    let registry = RegistryBuilder::from_manifest(cx.project.manifest())?.build();

    let mut artifacts = BTreeMap::new();
    let mut wrappers = BTreeMap::new();

    if opts.build {
        let toolset = cx.toolset(platform)?;
        let names: Vec<String> = cx.project.artifact_names().map(String::from).collect();
        for output in build_platform(cx, &toolset, &inputs, &names, &mut |_| {})? {
            artifacts.insert(output.artifact.name().to_string(), output);
        }

        let built: BTreeMap<_, _> = artifacts
            .iter()
            .map(|(name, output)| (name.clone(), output.artifact.clone()))
            .collect();
        wrappers.insert(ExecutionProfile::Packaged, cx.compose_packaged(&built)?);
    }

    for profile in [ExecutionProfile::LocalDebug, ExecutionProfile::LocalRelease] {
        wrappers.insert(profile, cx.compose_local(profile)?);
    }

    Ok(PlatformOutputs {
        platform: platform.clone(),
        inputs,
        artifacts,
        wrappers,
        registry,
    })
}
