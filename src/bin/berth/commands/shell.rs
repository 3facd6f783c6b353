//! `berth shell` command
//!
//! Starts an interactive shell with the platform's tools on PATH after
//! printing the command registry.

use anyhow::Result;
use berth::ops::{dev_shell, registry};
use berth::util::shell::Status;

use super::Session;
use crate::cli::ShellArgs;
use crate::GlobalOptions;

pub fn execute(args: ShellArgs, opts: &GlobalOptions) -> Result<i32> {
    let shell = &opts.shell;
    let session = Session::load(opts)?;
    let cx = session.context(opts);
    let platform = session.platform(args.platform)?;

    let registry = registry(&cx)?;
    if !shell.is_quiet() {
        eprintln!("Commands (run with `berth cmd <name>`):");
        eprint!("{}", registry.render_menu());
    }

    shell.status(
        Status::Running,
        format!("{} shell ({})", session.project.manifest().name(), platform),
    );
    dev_shell(&cx, &platform)
}
