//! High-level operations.
//!
//! This module contains the implementation of berth commands.

pub mod berth_build;
pub mod berth_run;
pub mod evaluate;
pub mod lockfile;

pub use berth_build::{build, select_artifacts, BuildOptions, BuildReport};
pub use berth_run::{
    compose_wrapper, dev_shell, find_command, missing_directories, registry, run_command,
    run_wrapper,
};
pub use evaluate::{
    evaluate, select_platforms, EvalContext, EvalError, EvalOptions, Evaluation, PlatformOutputs,
};
pub use lockfile::{compute_manifest_hash, lock, lockfile_needs_update, save_lockfile};
