//! berth - declarative builds and runtime composition for a program and
//! its companion service
//!
//! This crate provides the core library functionality for berth, including
//! input resolution, hash-checked artifact builds, wrapper composition and
//! the command registry.

pub mod builder;
pub mod compose;
pub mod core;
pub mod ops;
pub mod registry;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities for berth unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a fake build backend, a fixed tool provider and fixture
/// writers.
#[cfg(test)]
pub mod test_support;

pub use core::{
    artifact::{ArtifactSpec, BuiltArtifact},
    input::InputReference,
    manifest::Manifest,
    platform::Platform,
    profile::ExecutionProfile,
    project::Project,
    wrapper::ComposedWrapper,
};

pub use builder::ArtifactBuilder;
pub use registry::CommandRegistry;
pub use resolver::InputResolver;
pub use util::context::GlobalContext;
