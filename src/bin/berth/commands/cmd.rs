//! `berth cmd` command

use anyhow::Result;
use berth::ops::{find_command, registry, run_command};
use berth::util::shell::Status;

use super::{report_event, Session};
use crate::cli::CmdArgs;
use crate::GlobalOptions;

pub fn execute(args: CmdArgs, opts: &GlobalOptions) -> Result<i32> {
    let shell = &opts.shell;
    let session = Session::load(opts)?;
    let cx = session.context(opts);
    let registry = registry(&cx)?;

    let Some(name) = args.name else {
        print!("{}", registry.render_menu());
        return Ok(0);
    };

    let command = find_command(&registry, &name)?;
    let platform = session.platform(args.platform)?;

    shell.status(Status::Running, format!("`{}`: {}", command.name, command.invocation));
    run_command(&cx, command, &platform, &args.args, &mut |event| {
        report_event(shell, event)
    })
}
