//! Core data structures for berth.
//!
//! This module contains the foundational types used throughout berth:
//! - Input references and resolved inputs
//! - Platforms and execution profiles
//! - Artifact specs, built artifacts and composed wrappers
//! - Manifests and projects

pub mod artifact;
pub mod command;
pub mod input;
pub mod manifest;
pub mod platform;
pub mod profile;
pub mod project;
pub mod wrapper;

pub use artifact::{ArtifactSpec, BuiltArtifact};
pub use command::{Command, Invocation};
pub use input::{InputReference, Locator, ResolvedInput, ResolvedInputs};
pub use manifest::Manifest;
pub use platform::Platform;
pub use profile::ExecutionProfile;
pub use project::Project;
pub use wrapper::{ComposedWrapper, Discovery};
