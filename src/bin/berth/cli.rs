//! CLI definitions using clap.

use std::path::PathBuf;

use berth::core::input::InputReference;
use berth::core::platform::Platform;
use berth::core::profile::ExecutionProfile;
use berth::util::shell::ColorChoice;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

/// berth - build a program and its companion service, and compose the
/// environment that runs them together
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Path to Berth.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Replace a manifest input for this invocation (NAME@LOCATOR)
    #[arg(long = "override-input", global = true, value_name = "NAME@LOCATOR")]
    pub override_input: Vec<InputReference>,

    /// Run without accessing the network
    #[arg(long, global = true)]
    pub offline: bool,

    /// Directory of the companion project for the local profiles
    #[arg(long, global = true, value_name = "DIR", env = "BERTH_SIBLING_DIR")]
    pub sibling_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build artifacts and print their store paths
    Build(BuildArgs),

    /// Compose a wrapper and run it
    Run(RunArgs),

    /// Print the composed wrapper for a profile
    Wrapper(WrapperArgs),

    /// Start the development shell
    Shell(ShellArgs),

    /// List or run registry commands
    Cmd(CmdArgs),

    /// Check formatting
    Fmt(FmtArgs),

    /// Evaluate every selected platform and report the results
    Eval(EvalArgs),

    /// Resolve inputs and write Berth.lock
    Lock(LockArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Commands {
    /// Whether the command prints machine-readable output.
    pub fn json(&self) -> bool {
        match self {
            Commands::Build(args) => args.json,
            Commands::Wrapper(args) => args.json,
            Commands::Eval(args) => args.json,
            _ => false,
        }
    }
}

#[derive(Args)]
pub struct BuildArgs {
    /// Artifacts to build (defaults to all)
    #[arg(value_name = "ARTIFACT")]
    pub artifacts: Vec<String>,

    /// Platform to build for (repeatable, defaults to the host)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Vec<Platform>,

    /// Build for every supported platform
    #[arg(long, conflicts_with = "platform")]
    pub all_platforms: bool,

    /// Number of parallel jobs for the build backend
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Emit JSON events instead of status lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct RunArgs {
    /// Execution profile
    #[arg(long, default_value = "packaged")]
    pub profile: ExecutionProfile,

    /// Platform whose artifacts are used (defaults to the host)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<Platform>,

    /// Arguments passed to the primary executable
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct WrapperArgs {
    /// Execution profile
    #[arg(long, default_value = "packaged")]
    pub profile: ExecutionProfile,

    /// Platform whose artifacts are used (defaults to the host)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<Platform>,

    /// Print the wrapper as JSON instead of a shell script
    #[arg(long)]
    pub json: bool,

    /// Warn about directories the wrapper refers to that do not exist
    #[arg(long)]
    pub check: bool,
}

#[derive(Args)]
pub struct ShellArgs {
    /// Platform whose tools are put on PATH (defaults to the host)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<Platform>,
}

#[derive(Args)]
pub struct CmdArgs {
    /// Command to run; lists the registry when omitted
    pub name: Option<String>,

    /// Platform to run on (defaults to the host)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<Platform>,

    /// Arguments passed to the command
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct FmtArgs {
    /// Arguments passed to the formatter
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct EvalArgs {
    /// Evaluate every supported platform
    #[arg(long, conflicts_with = "platform")]
    pub all_platforms: bool,

    /// Platform to evaluate (repeatable, defaults to the host)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Vec<Platform>,

    /// Only compose the local profiles; nothing is built
    #[arg(long)]
    pub no_build: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct LockArgs {
    /// Ignore existing pins and re-resolve every input
    #[arg(long)]
    pub update: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_override_input() {
        let cli = Cli::try_parse_from([
            "berth",
            "--override-input",
            "shellac-server@../shellac",
            "wrapper",
            "--profile",
            "local-debug",
        ])
        .unwrap();

        assert_eq!(cli.override_input.len(), 1);
        assert_eq!(cli.override_input[0].name, "shellac-server");
        match cli.command {
            Commands::Wrapper(args) => assert_eq!(args.profile, ExecutionProfile::LocalDebug),
            _ => panic!("expected wrapper"),
        }
    }

    #[test]
    fn test_trailing_args() {
        let cli = Cli::try_parse_from(["berth", "cmd", "lint", "--", "--fix", "-v"]).unwrap();
        match cli.command {
            Commands::Cmd(args) => {
                assert_eq!(args.name.as_deref(), Some("lint"));
                assert_eq!(args.args, vec!["--fix", "-v"]);
            }
            _ => panic!("expected cmd"),
        }
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(Cli::try_parse_from(["berth", "--override-input", "no-at-sign", "eval"]).is_err());
    }
}
