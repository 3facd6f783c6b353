//! `berth lock` command
//!
//! Resolves the inputs of every supported platform and records the git
//! revisions in Berth.lock.

use anyhow::Result;
use berth::ops::{lock, lockfile_needs_update, save_lockfile};
use berth::util::shell::Status;

use super::Session;
use crate::cli::LockArgs;
use crate::GlobalOptions;

pub fn execute(args: LockArgs, opts: &GlobalOptions) -> Result<i32> {
    let shell = &opts.shell;
    let mut session = Session::load(opts)?;

    if !args.update && !lockfile_needs_update(&session.project)? {
        shell.status(Status::Fresh, "Berth.lock is up to date");
        return Ok(0);
    }
    if args.update {
        session.project = session.project.without_lock();
    }

    let platforms = session.project.manifest().platforms.supported.clone();
    let cx = session.context(opts);

    shell.status(
        Status::Resolving,
        format!("inputs for {} platform(s)", platforms.len()),
    );
    let lockfile = lock(&cx, &platforms)?;

    for input in &lockfile.inputs {
        let scope = input
            .platform
            .as_ref()
            .map(|p| format!(" ({})", p))
            .unwrap_or_default();
        shell.status(
            Status::Locked,
            format!("{} {} @ {}{}", input.name, input.source, input.rev, scope),
        );
    }

    save_lockfile(cx.project(), &lockfile)?;
    shell.status(Status::Finished, format!("wrote {}", cx.project().lockfile_path().display()));
    Ok(0)
}
