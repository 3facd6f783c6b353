//! `berth eval` command
//!
//! Resolves, builds and composes every selected platform and reports each
//! one. A failing platform never hides the results of the others.

use anyhow::Result;
use berth::ops::{evaluate, select_platforms, EvalOptions};
use berth::util::diagnostic;
use berth::util::shell::Status;

use super::Session;
use crate::cli::EvalArgs;
use crate::GlobalOptions;

pub fn execute(args: EvalArgs, opts: &GlobalOptions) -> Result<i32> {
    let shell = &opts.shell;
    let session = Session::load(opts)?;
    let cx = session.context(opts);

    let eval_opts = EvalOptions {
        platforms: select_platforms(&session.project, &args.platform, args.all_platforms)?,
        build: !args.no_build,
    };
    let evaluation = evaluate(&cx, &eval_opts);

    if shell.is_json() {
        shell.json_event(&evaluation.to_json());
        return Ok(evaluation.exit_code());
    }

    for result in &evaluation.platforms {
        match &result.outcome {
            Ok(outputs) => {
                shell.status(Status::Finished, &result.platform);
                for (name, output) in &outputs.artifacts {
                    shell.note(format!("{} -> {}", name, output.artifact.root().display()));
                }
                for (profile, wrapper) in &outputs.wrappers {
                    shell.note(format!(
                        "{} wrapper runs `{}` ({} path entries)",
                        profile,
                        wrapper.command(),
                        wrapper.search_path().len()
                    ));
                }
                shell.note(format!("{} command(s) registered", outputs.registry.len()));
            }
            Err(e) => {
                shell.status(Status::Error, format!("{} failed", result.platform));
                diagnostic::emit(&e.to_diagnostic(), shell.use_color());
            }
        }
    }

    let failed = evaluation.failed().count();
    if failed > 0 {
        shell.warn(format!(
            "{} of {} platform(s) failed",
            failed,
            evaluation.platforms.len()
        ));
    }

    Ok(evaluation.exit_code())
}
