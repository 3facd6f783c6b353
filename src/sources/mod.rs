//! Input sources.
//!
//! Sources are responsible for making an input's tree available locally
//! (local paths, git repositories).

pub mod cache;
pub mod git;
pub mod path;
pub mod source;

pub use cache::SourceCache;
pub use git::GitSource;
pub use path::PathSource;
pub use source::{Snapshot, Source};
