//! Extension points around a lookup.

use crate::error::CoreError;
use crate::finder::Match;
use crate::service::Lookup;

/// Pre- and post-processing around a lookup.
///
/// Both methods default to pass-through, so implementors override only what
/// they need.
pub trait Hooks: Send + Sync {
    /// Runs before any template is matched. Returning a body skips matching
    /// and replies with it directly.
    fn before_lookup(&self, _lookup: &Lookup) -> Result<Option<String>, CoreError> {
        Ok(None)
    }

    /// Runs after a match was selected and returns the final response body.
    fn after_match(
        &self,
        _lookup: &Lookup,
        _matched: &Match,
        response: String,
    ) -> Result<String, CoreError> {
        Ok(response)
    }
}

/// Hooks that never intervene.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl Hooks for NoHooks {}
