//! `berth build` command

use anyhow::Result;
use berth::builder::BuildEvent;
use berth::ops::{build, select_artifacts, select_platforms, BuildOptions};
use berth::util::diagnostic;
use berth::util::shell::Status;

use super::{report_event, Session};
use crate::cli::BuildArgs;
use crate::GlobalOptions;

pub fn execute(args: BuildArgs, opts: &GlobalOptions) -> Result<i32> {
    let shell = &opts.shell;
    let session = Session::load(opts)?;

    // Jobs: CLI > config > backend default
    let cx = session.context(opts).with_jobs(args.jobs);

    let platforms = select_platforms(&session.project, &args.platform, args.all_platforms)?;
    let artifacts = select_artifacts(&session.project, &args.artifacts)?;
    let total = (platforms.len() * artifacts.len()) as u64;

    let build_opts = BuildOptions {
        platforms,
        artifacts,
    };

    let mut progress = shell.progress(total, "Building");
    let report = build(&cx, &build_opts, &mut |event: &BuildEvent| {
        report_event(shell, event);
        if matches!(event, BuildEvent::ArtifactFinished { .. }) {
            progress.inc(1);
        }
    })?;
    progress.finish();

    for platform in &report.platforms {
        match &platform.outcome {
            Ok(outputs) => {
                for output in outputs {
                    if !shell.is_json() {
                        println!("{}", output.artifact.root().display());
                    }
                }
            }
            Err(e) => {
                if shell.is_json() {
                    shell.json_event(&serde_json::json!({
                        "reason": "platform-failed",
                        "platform": platform.platform.to_string(),
                        "message": e.to_string(),
                        "exit_code": e.exit_code(),
                    }));
                } else {
                    shell.status(Status::Error, format!("build failed for {}", platform.platform));
                    diagnostic::emit(&e.to_diagnostic(), shell.use_color());
                }
            }
        }
    }

    let failed = report.platforms.iter().filter(|p| p.outcome.is_err()).count();
    if failed == 0 {
        shell.status(
            Status::Finished,
            format!("{} artifact(s) for {} platform(s)", total, report.platforms.len()),
        );
    } else {
        shell.warn(format!(
            "{} of {} platform(s) failed",
            failed,
            report.platforms.len()
        ));
    }

    shell.json_event(&serde_json::json!({
        "reason": "build-finished",
        "success": report.is_success(),
    }));

    Ok(report.exit_code())
}
