//! Source trait - common interface for all input sources.

use std::path::PathBuf;

use crate::resolver::ResolutionError;

/// A concrete, local copy of an input's source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Directory holding the source
    pub path: PathBuf,
    /// Commit id, for sources that have one
    pub revision: Option<String>,
}

/// A place input sources come from.
pub trait Source {
    /// Get the source name for display.
    fn name(&self) -> &str;

    /// Check if the source can be used without touching the network.
    fn is_cached(&self) -> bool;

    /// Make the source available locally and describe the snapshot.
    fn fetch(&mut self) -> Result<Snapshot, ResolutionError>;
}
