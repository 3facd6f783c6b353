//! Implementation of `berth build`.

use anyhow::{bail, Result};

use crate::builder::{ArtifactBuilder, BuildEvent, Freshness, Toolset};
use crate::core::input::ResolvedInputs;
use crate::core::platform::Platform;
use crate::core::project::Project;
use crate::ops::evaluate::{dedup_in_order, ArtifactOutput, EvalContext, EvalError};
use crate::resolver::InputResolver;
use crate::util::diagnostic::exit;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Platforms to build for, in order
    pub platforms: Vec<Platform>,

    /// Artifacts to build (empty = all)
    pub artifacts: Vec<String>,
}

/// Validate that all requested artifacts exist in the manifest.
///
/// This prevents silent no-ops when the user mistypes an artifact name.
pub fn select_artifacts(project: &Project, filter: &[String]) -> Result<Vec<String>> {
    let available: Vec<&str> = project.artifact_names().collect();

    if filter.is_empty() {
        return Ok(available.into_iter().map(String::from).collect());
    }

    for requested in filter {
        if !available.contains(&requested.as_str()) {
            bail!(
                "unknown artifact `{}`\n\
                 available artifacts: {}",
                requested,
                available.join(", ")
            );
        }
    }

    Ok(dedup_in_order(filter))
}

/// Build the named artifacts of one platform, in order.
///
/// Stops at the first failing artifact.
pub fn build_platform(
    cx: &EvalContext<'_>,
    toolset: &Toolset,
    inputs: &ResolvedInputs,
    names: &[String],
    on_event: &mut dyn FnMut(&BuildEvent),
) -> Result<Vec<ArtifactOutput>, EvalError> {
    let platform = toolset.platform();
    let builder = ArtifactBuilder::new(cx.backend(), toolset, cx.store_dir())
        .exclude_dir(cx.cache_dir())
        .with_jobs(cx.jobs());

    let mut outputs = Vec::with_capacity(names.len());
    for name in names {
        let spec = cx.project().artifact_spec(name, inputs)?;

        on_event(&BuildEvent::ArtifactStarted {
            platform: platform.clone(),
            artifact: name.clone(),
        });

        let (artifact, freshness) = builder.build_with_freshness(&spec)?;

        on_event(&BuildEvent::ArtifactFinished {
            platform: platform.clone(),
            artifact: name.clone(),
            root: artifact.root().to_path_buf(),
            content_hash: artifact.content_hash().to_string(),
            fresh: freshness == Freshness::Fresh,
        });

        outputs.push(ArtifactOutput {
            artifact,
            freshness,
        });
    }

    Ok(outputs)
}

/// Outcome of building one platform.
#[derive(Debug)]
pub struct PlatformBuild {
    pub platform: Platform,
    pub outcome: Result<Vec<ArtifactOutput>, EvalError>,
}

/// Results of a build over several platforms.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub platforms: Vec<PlatformBuild>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.platforms.iter().all(|p| p.outcome.is_ok())
    }

    /// A single platform reports its own failure code; several report
    /// the platforms-failed code.
    pub fn exit_code(&self) -> i32 {
        let failures: Vec<&EvalError> = self
            .platforms
            .iter()
            .filter_map(|p| p.outcome.as_ref().err())
            .collect();

        match (failures.as_slice(), self.platforms.len()) {
            ([], _) => exit::SUCCESS,
            ([only], 1) => only.exit_code(),
            _ => exit::PLATFORMS_FAILED,
        }
    }
}

fn resolve_and_build(
    cx: &EvalContext<'_>,
    resolver: &mut InputResolver,
    platform: &Platform,
    names: &[String],
    on_event: &mut dyn FnMut(&BuildEvent),
) -> Result<Vec<ArtifactOutput>, EvalError> {
    let inputs = cx.resolve(resolver, platform)?;
    let toolset = cx.toolset(platform)?;
    build_platform(cx, &toolset, &inputs, names, on_event)
}

/// Build artifacts for every platform in `opts`.
///
/// Each platform resolves, locates tools and builds on its own; a failure
/// is recorded and the next platform still runs.
pub fn build(
    cx: &EvalContext<'_>,
    opts: &BuildOptions,
    on_event: &mut dyn FnMut(&BuildEvent),
) -> Result<BuildReport> {
    let names = select_artifacts(cx.project(), &opts.artifacts)?;
    let mut resolver = cx.resolver();
    let mut report = BuildReport::default();

    for platform in &opts.platforms {
        let outcome = resolve_and_build(cx, &mut resolver, platform, &names, on_event);

        on_event(&BuildEvent::PlatformFinished {
            platform: platform.clone(),
            success: outcome.is_ok(),
            artifacts: outcome.as_ref().map(Vec::len).unwrap_or(0),
        });

        report.platforms.push(PlatformBuild {
            platform: platform.clone(),
            outcome,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::builder::BuildError;
    use crate::test_support::{load_project, write_file, FakeBackend, StaticToolProvider, ION_MANIFEST};
    use crate::util::config::Config;
    use crate::util::context::GlobalContext;

    fn setup(tmp: &TempDir) -> Project {
        let root = tmp.path().join("work/ion");
        write_file(&root.join("src/main.rs"), "fn main() {}");
        write_file(&tmp.path().join("work/shellac-server/src/main.rs"), "fn main() {}");
        write_file(&tmp.path().join("work/shellac-server/completion/ion.toml"), "");
        load_project(&root, ION_MANIFEST)
    }

    fn context<'a>(tmp: &TempDir, project: &'a Project, backend: FakeBackend) -> EvalContext<'a> {
        let gctx = GlobalContext::with_cwd(project.root().to_path_buf()).unwrap();
        EvalContext::new(project, &gctx, &Config::default(), None)
            .with_backend(backend)
            .with_tool_provider(StaticToolProvider::new(["cargo", "rustc"]))
            .with_store_dir(tmp.path().join("store"))
            .with_cache_dir(tmp.path().join("cache"))
    }

    #[test]
    fn test_select_artifacts() {
        let tmp = TempDir::new().unwrap();
        let project = setup(&tmp);

        assert_eq!(select_artifacts(&project, &[]).unwrap(), vec!["ion", "shellac"]);
        assert_eq!(
            select_artifacts(&project, &["shellac".to_string()]).unwrap(),
            vec!["shellac"]
        );

        let repeated: Vec<String> = ["shellac", "ion", "shellac"].map(String::from).to_vec();
        assert_eq!(
            select_artifacts(&project, &repeated).unwrap(),
            vec!["shellac", "ion"]
        );

        let err = select_artifacts(&project, &["fish".to_string()]).unwrap_err();
        assert!(err.to_string().contains("available artifacts: ion, shellac"));
    }

    #[test]
    fn test_build_emits_events() {
        let tmp = TempDir::new().unwrap();
        let project = setup(&tmp);
        let cx = context(&tmp, &project, FakeBackend::new());

        let opts = BuildOptions {
            platforms: vec!["x86_64-linux".parse().unwrap()],
            artifacts: vec!["shellac".to_string()],
        };
        let mut events = Vec::new();
        let report = build(&cx, &opts, &mut |e| events.push(e.clone())).unwrap();

        assert!(report.is_success());
        assert_eq!(report.exit_code(), exit::SUCCESS);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], BuildEvent::ArtifactStarted { .. }));
        assert!(matches!(events[1], BuildEvent::ArtifactFinished { fresh: false, .. }));
        assert!(matches!(
            events[2],
            BuildEvent::PlatformFinished {
                success: true,
                artifacts: 1,
                ..
            }
        ));

        // Second run reuses the store.
        let mut events = Vec::new();
        build(&cx, &opts, &mut |e| events.push(e.clone())).unwrap();
        assert!(matches!(events[1], BuildEvent::ArtifactFinished { fresh: true, .. }));
    }

    #[test]
    fn test_single_platform_failure_keeps_its_code() {
        let tmp = TempDir::new().unwrap();
        let project = setup(&tmp);
        let cx = context(&tmp, &project, FakeBackend::failing("boom"));

        let report = build(
            &cx,
            &BuildOptions {
                platforms: vec!["x86_64-linux".parse().unwrap()],
                artifacts: Vec::new(),
            },
            &mut |_| {},
        )
        .unwrap();

        assert!(matches!(
            report.platforms[0].outcome,
            Err(EvalError::Build(BuildError::Backend { .. }))
        ));
        assert_eq!(report.exit_code(), exit::BUILD);
    }

    #[test]
    fn test_multi_platform_failure_code() {
        let tmp = TempDir::new().unwrap();
        let project = setup(&tmp);
        let cx = context(&tmp, &project, FakeBackend::failing_for("aarch64-linux", "boom"));

        let report = build(
            &cx,
            &BuildOptions {
                platforms: vec!["x86_64-linux".parse().unwrap(), "aarch64-linux".parse().unwrap()],
                artifacts: Vec::new(),
            },
            &mut |_| {},
        )
        .unwrap();

        assert!(report.platforms[0].outcome.is_ok());
        assert!(report.platforms[1].outcome.is_err());
        assert_eq!(report.exit_code(), exit::PLATFORMS_FAILED);
    }
}
