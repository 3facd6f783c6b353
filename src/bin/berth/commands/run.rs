//! `berth run` command

use anyhow::Result;
use berth::ops::{compose_wrapper, run_wrapper};
use berth::util::shell::Status;

use super::{report_event, Session};
use crate::cli::RunArgs;
use crate::GlobalOptions;

pub fn execute(args: RunArgs, opts: &GlobalOptions) -> Result<i32> {
    let shell = &opts.shell;
    let session = Session::load(opts)?;
    let cx = session.context(opts);

    let platform = session.profile_platform(args.profile, args.platform)?;

    let wrapper = compose_wrapper(&cx, args.profile, &platform, &mut |event| {
        report_event(shell, event)
    })?;

    shell.status(
        Status::Running,
        format!("`{}` ({})", wrapper.command(), wrapper.profile()),
    );
    run_wrapper(&wrapper, session.project.root(), &args.args)
}
