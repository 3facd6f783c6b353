//! Command implementations

pub mod build;
pub mod cmd;
pub mod completions;
pub mod eval;
pub mod fmt;
pub mod lock;
pub mod run;
pub mod shell;
pub mod wrapper;

use anyhow::{Context, Result};
use berth::builder::BuildEvent;
use berth::core::platform::Platform;
use berth::core::profile::ExecutionProfile;
use berth::core::project::Project;
use berth::ops::{select_platforms, EvalContext};
use berth::util::config::{load_config, Config};
use berth::util::context::project_config_path;
use berth::util::fs::absolutize;
use berth::util::shell::{Shell, Status};
use berth::util::GlobalContext;

use crate::GlobalOptions;

/// The loaded project with its environment and merged configuration.
pub struct Session {
    pub gctx: GlobalContext,
    pub project: Project,
    pub config: Config,
}

impl Session {
    /// Locate and load the project.
    ///
    /// `--manifest-path` wins over searching upward from the working
    /// directory.
    pub fn load(opts: &GlobalOptions) -> Result<Session> {
        let gctx = GlobalContext::new()?;

        let manifest_path = match &opts.manifest_path {
            Some(path) => absolutize(gctx.cwd(), path),
            None => gctx.find_manifest()?,
        };

        let project = Project::load(&manifest_path)
            .with_context(|| format!("failed to load project at {}", manifest_path.display()))?;
        let config = load_config(&gctx.config_path(), &project_config_path(project.root()));

        Ok(Session {
            gctx,
            project,
            config,
        })
    }

    /// Evaluation context carrying the global flags.
    pub fn context(&self, opts: &GlobalOptions) -> EvalContext<'_> {
        EvalContext::new(
            &self.project,
            &self.gctx,
            &self.config,
            opts.sibling_dir.as_deref(),
        )
        .with_overrides(opts.overrides.clone())
        .offline(opts.offline)
    }

    /// The single platform a command works on: the requested one or the
    /// host.
    pub fn platform(&self, requested: Option<Platform>) -> Result<Platform> {
        let requested: Vec<Platform> = requested.into_iter().collect();
        let mut selected = select_platforms(&self.project, &requested, false)?;
        selected.pop().context("no platform selected")
    }

    /// Like [`Session::platform`], but local profiles only point at
    /// directory templates and accept any platform.
    pub fn profile_platform(
        &self,
        profile: ExecutionProfile,
        requested: Option<Platform>,
    ) -> Result<Platform> {
        if profile.is_local() {
            return Ok(requested.unwrap_or_else(Platform::host));
        }
        self.platform(requested)
    }
}

/// Report a build event through the shell.
pub fn report_event(shell: &Shell, event: &BuildEvent) {
    if shell.is_json() {
        shell.json_event(&event.to_json());
        return;
    }

    match event {
        BuildEvent::ArtifactStarted { platform, artifact } => {
            shell.status(Status::Building, format!("{} ({})", artifact, platform));
        }
        BuildEvent::ArtifactFinished {
            platform,
            artifact,
            fresh: true,
            ..
        } => {
            shell.status(Status::Fresh, format!("{} ({})", artifact, platform));
        }
        BuildEvent::ArtifactFinished { .. } => {}
        BuildEvent::PlatformFinished { .. } => {}
    }
}
