//! Running wrappers, registry commands and the development shell.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::{BuildEvent, Toolset};
use crate::core::command::{Command, Invocation};
use crate::core::platform::Platform;
use crate::core::profile::ExecutionProfile;
use crate::core::wrapper::ComposedWrapper;
use crate::ops::berth_build::build_platform;
use crate::ops::evaluate::EvalContext;
use crate::registry::{CommandRegistry, RegistryBuilder};
use crate::util::process::ProcessBuilder;

/// Set in the environment of `berth shell` children.
pub const SHELL_MARKER_ENV: &str = "BERTH_SHELL";

/// Compose the wrapper for `profile` on `platform`.
///
/// Local profiles only need directory templates and skip resolution. The
/// packaged profile resolves inputs and builds the primary and companion
/// artifacts first.
pub fn compose_wrapper(
    cx: &EvalContext<'_>,
    profile: ExecutionProfile,
    platform: &Platform,
    on_event: &mut dyn FnMut(&BuildEvent),
) -> Result<ComposedWrapper> {
    if profile.is_local() {
        return Ok(cx.compose_local(profile)?);
    }

    let decl = &cx.project().manifest().compose;
    let mut names = vec![decl.primary.clone()];
    names.extend(decl.companion.iter().cloned());

    let mut resolver = cx.resolver();
    let inputs = cx.resolve(&mut resolver, platform)?;
    let toolset = cx.toolset(platform)?;
    let built: BTreeMap<_, _> = build_platform(cx, &toolset, &inputs, &names, on_event)?
        .into_iter()
        .map(|output| (output.artifact.name().to_string(), output.artifact))
        .collect();

    Ok(cx.compose_packaged(&built)?)
}

/// Directories a wrapper refers to that do not exist below `root`.
///
/// Composition never checks templates; this is for `berth wrapper --check`.
pub fn missing_directories(wrapper: &ComposedWrapper, root: &Path) -> Vec<PathBuf> {
    let rooted = wrapper.rooted_at(root);
    rooted
        .search_path()
        .iter()
        .map(PathBuf::as_path)
        .chain(rooted.discovery().map(|d| d.value.as_path()))
        .filter(|dir| !dir.is_dir())
        .map(Path::to_path_buf)
        .collect()
}

/// The process a wrapper runs, with relative paths anchored at `root`.
pub fn wrapper_process(wrapper: &ComposedWrapper, root: &Path, args: &[String]) -> Result<ProcessBuilder> {
    let rooted = wrapper.rooted_at(root);
    let path = rooted
        .search_path_value(std::env::var_os("PATH").as_deref())
        .context("wrapper search path contains an invalid entry")?;

    let mut pb = ProcessBuilder::new(rooted.command())
        .args(args)
        .env("PATH", path);
    for (name, value) in rooted.variables() {
        pb = pb.env(name, value);
    }
    Ok(pb)
}

/// Execute a wrapper and return the child's exit code.
///
/// On unix this replaces the current process.
pub fn run_wrapper(wrapper: &ComposedWrapper, root: &Path, args: &[String]) -> Result<i32> {
    let pb = wrapper_process(wrapper, root, args)?;
    tracing::debug!("exec `{}` ({})", pb.display_command(), wrapper.profile());
    pb.exec_replace()
}

/// The `sh -c` process of a literal command.
///
/// Extra arguments are passed through as `"$@"`.
pub fn shell_process(run: &str, args: &[String], toolset: &Toolset, root: &Path) -> Result<ProcessBuilder> {
    let sh = toolset.get("sh").map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("sh"));
    let script = if args.is_empty() {
        run.to_string()
    } else {
        format!("{} \"$@\"", run)
    };

    ProcessBuilder::new(sh)
        .arg("-c")
        .arg(script)
        .arg("berth")
        .args(args)
        .cwd(root)
        .prepend_path(toolset.bin_dirs())
}

/// The project's registry.
pub fn registry(cx: &EvalContext<'_>) -> Result<CommandRegistry> {
    Ok(RegistryBuilder::from_manifest(cx.project().manifest())?.build())
}

/// Look up a registry command by name.
pub fn find_command<'r>(registry: &'r CommandRegistry, name: &str) -> Result<&'r Command> {
    registry.get(name).with_context(|| {
        format!(
            "no command named `{}`\navailable commands: {}",
            name,
            registry
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

/// Run a registry command on `platform` and return its exit code.
pub fn run_command(
    cx: &EvalContext<'_>,
    command: &Command,
    platform: &Platform,
    args: &[String],
    on_event: &mut dyn FnMut(&BuildEvent),
) -> Result<i32> {
    let root = cx.project().root();
    match &command.invocation {
        Invocation::Shell(run) => {
            let toolset = cx.toolset(platform)?;
            let pb = shell_process(run, args, &toolset, root)?;
            tracing::debug!("running `{}`: {}", command.name, run);
            let status = pb.status()?;
            Ok(status.code().unwrap_or(1))
        }
        Invocation::Wrapper(profile) => {
            let wrapper = compose_wrapper(cx, *profile, platform, on_event)?;
            run_wrapper(&wrapper, root, args)
        }
    }
}

/// Start an interactive shell with the platform's tools on `PATH`.
pub fn dev_shell(cx: &EvalContext<'_>, platform: &Platform) -> Result<i32> {
    let toolset = cx.toolset(platform)?;
    let shell = std::env::var_os("SHELL")
        .map(PathBuf::from)
        .or_else(|| toolset.get("sh").map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("sh"));

    let pb = ProcessBuilder::new(shell)
        .cwd(cx.project().root())
        .env(SHELL_MARKER_ENV, cx.project().manifest().name())
        .prepend_path(toolset.bin_dirs())?;
    let status = pb.status()?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use tempfile::TempDir;

    use super::*;
    use crate::compose::{compose, ComposeOptions, Location, PathTemplate};

    fn local_wrapper() -> ComposedWrapper {
        let profile = ExecutionProfile::LocalDebug;
        compose(
            profile,
            &Location::Template(PathTemplate::new(".", profile, "ion")),
            Some(&Location::Template(PathTemplate::new(
                "../shellac-server",
                profile,
                "shellac",
            ))),
            &ComposeOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_wrapper_process_environment() {
        let root = Path::new("/work/ion");
        let pb = wrapper_process(&local_wrapper(), root, &["-c".to_string(), "echo".to_string()]).unwrap();

        assert_eq!(pb.get_program(), Path::new("ion"));
        assert_eq!(
            pb.get_env("COMPLETION_DIR").unwrap(),
            OsStr::new("/work/shellac-server/completion")
        );
        let path = pb.get_env("PATH").unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(path).collect();
        assert_eq!(entries[0], PathBuf::from("/work/shellac-server/target/debug"));
        assert_eq!(entries[1], PathBuf::from("/work/ion/target/debug"));
        assert_eq!(pb.display_command(), "ion -c echo");
    }

    #[test]
    fn test_missing_directories() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("ion");
        std::fs::create_dir_all(root.join("target/debug")).unwrap();

        let missing = missing_directories(&local_wrapper(), &root);
        assert_eq!(
            missing,
            vec![
                tmp.path().join("shellac-server/target/debug"),
                tmp.path().join("shellac-server/completion"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_process_runs_in_root() {
        let tmp = TempDir::new().unwrap();
        let toolset = Toolset::new("x86_64-linux".parse().unwrap());
        let output = shell_process("pwd; echo", &["a b".to_string()], &toolset, tmp.path())
            .unwrap()
            .exec()
            .unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();
        let pwd = PathBuf::from(lines.next().unwrap());
        assert_eq!(
            pwd.canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
        assert_eq!(lines.next(), Some("a b"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_process_exit_code() {
        let tmp = TempDir::new().unwrap();
        let toolset = Toolset::new("x86_64-linux".parse().unwrap());
        let status = shell_process("exit 7", &[], &toolset, tmp.path())
            .unwrap()
            .exec()
            .unwrap()
            .status;
        assert_eq!(status.code(), Some(7));
    }

    #[test]
    fn test_find_command_lists_available() {
        let mut builder = RegistryBuilder::new();
        builder.register(Command::shell("fmt", "", "cargo fmt")).unwrap();
        let registry = builder.build();

        assert!(find_command(&registry, "fmt").is_ok());
        let err = find_command(&registry, "lint").unwrap_err();
        assert!(err.to_string().contains("available commands: fmt"));
    }
}
