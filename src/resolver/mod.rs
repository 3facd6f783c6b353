//! Input resolution.
//!
//! Turns the named input references of one evaluation into concrete source
//! snapshots. Conflicts are detected before anything is fetched.

pub mod encode;
pub mod errors;

pub use encode::Lockfile;
pub use errors::ResolutionError;

use std::collections::BTreeMap;

use crate::core::input::{InputReference, ResolvedInput, ResolvedInputs};
use crate::sources::SourceCache;

/// Resolves input references through a shared [`SourceCache`].
pub struct InputResolver {
    cache: SourceCache,
}

impl InputResolver {
    pub fn new(cache: SourceCache) -> Self {
        InputResolver { cache }
    }

    /// Resolve every reference to a snapshot.
    ///
    /// Identical references collapse into one; two references with the same
    /// name but a different locator or pin are a [`ResolutionError::Conflict`].
    pub fn resolve(&mut self, refs: &[InputReference]) -> Result<ResolvedInputs, ResolutionError> {
        let mut unique: BTreeMap<&str, &InputReference> = BTreeMap::new();
        for reference in refs {
            match unique.get(reference.name.as_str()) {
                Some(existing) if *existing != reference => {
                    return Err(ResolutionError::Conflict {
                        name: reference.name.clone(),
                        first: existing.to_string(),
                        second: reference.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    unique.insert(&reference.name, reference);
                }
            }
        }

        let mut resolved = ResolvedInputs::new();
        for reference in unique.into_values() {
            let snapshot = self.cache.snapshot(reference)?;
            resolved.insert(ResolvedInput {
                reference: reference.clone(),
                path: snapshot.path,
                revision: snapshot.revision,
            });
        }

        tracing::debug!("resolved {} input(s)", resolved.len());
        Ok(resolved)
    }

    /// The underlying cache.
    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }
}
