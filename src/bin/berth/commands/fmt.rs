//! `berth fmt` command
//!
//! Runs the registry's `fmt` command, which defaults to
//! `cargo fmt --all -- --check`.

use anyhow::Result;
use berth::ops::{find_command, registry, run_command};
use berth::util::shell::Status;

use super::{report_event, Session};
use crate::cli::FmtArgs;
use crate::GlobalOptions;

pub fn execute(args: FmtArgs, opts: &GlobalOptions) -> Result<i32> {
    let shell = &opts.shell;
    let session = Session::load(opts)?;
    let cx = session.context(opts);
    let registry = registry(&cx)?;

    let command = find_command(&registry, "fmt")?;
    let platform = session.platform(None)?;

    shell.status(Status::Running, &command.invocation);
    let code = run_command(&cx, command, &platform, &args.args, &mut |event| {
        report_event(shell, event)
    })?;

    if code != 0 {
        shell.warn("formatting check failed");
    }
    Ok(code)
}
