//! `berth wrapper` command

use anyhow::Result;
use berth::ops::{compose_wrapper, missing_directories};

use super::{report_event, Session};
use crate::cli::WrapperArgs;
use crate::GlobalOptions;

pub fn execute(args: WrapperArgs, opts: &GlobalOptions) -> Result<i32> {
    let shell = &opts.shell;
    let session = Session::load(opts)?;
    let cx = session.context(opts);

    let platform = session.profile_platform(args.profile, args.platform)?;

    let wrapper = compose_wrapper(&cx, args.profile, &platform, &mut |event| {
        report_event(shell, event)
    })?;

    if args.check {
        for dir in missing_directories(&wrapper, session.project.root()) {
            shell.warn(format!("{} does not exist", dir.display()));
        }
    }

    if args.json {
        let json = serde_json::json!({
            "reason": "wrapper",
            "platform": platform.to_string(),
            "wrapper": wrapper,
        });
        shell.json_event(&json);
    } else {
        print!("{}", wrapper.render_script());
    }

    Ok(0)
}
