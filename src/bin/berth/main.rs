//! berth CLI - builds a program and its companion service and composes
//! the environment that runs them together

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use berth::core::input::InputReference;
use berth::util::diagnostic;
use berth::util::shell::Shell;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Environment variable holding a `tracing` filter, e.g. `berth=trace`.
const LOG_ENV: &str = "BERTH_LOG";

/// Flags shared by every command.
pub struct GlobalOptions {
    pub shell: Arc<Shell>,
    pub manifest_path: Option<PathBuf>,
    pub overrides: Vec<InputReference>,
    pub offline: bool,
    pub sibling_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("berth=debug")
        } else {
            EnvFilter::new("berth=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color, cli.command.json());
    let opts = GlobalOptions {
        shell: Arc::new(shell),
        manifest_path: cli.manifest_path,
        overrides: cli.override_input,
        offline: cli.offline,
        sibling_dir: cli.sibling_dir,
    };

    let code = match run(cli.command, &opts) {
        Ok(code) => code,
        Err(e) => {
            if opts.shell.is_json() {
                opts.shell.error(format!("{:#}", e));
            } else {
                diagnostic::emit(&diagnostic::to_diagnostic(&e), opts.shell.use_color());
            }
            diagnostic::exit_code(&e)
        }
    };

    std::process::exit(code);
}

fn run(command: Commands, opts: &GlobalOptions) -> Result<i32> {
    match command {
        Commands::Build(args) => commands::build::execute(args, opts),
        Commands::Run(args) => commands::run::execute(args, opts),
        Commands::Wrapper(args) => commands::wrapper::execute(args, opts),
        Commands::Shell(args) => commands::shell::execute(args, opts),
        Commands::Cmd(args) => commands::cmd::execute(args, opts),
        Commands::Fmt(args) => commands::fmt::execute(args, opts),
        Commands::Eval(args) => commands::eval::execute(args, opts),
        Commands::Lock(args) => commands::lock::execute(args, opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
