//! The lookup service: discovery, selection policy, hooks and memoization.

use crate::cache::{CacheMetrics, LookupCache, DEFAULT_MAX_ENTRIES};
use crate::error::CoreError;
use crate::finder::{find_matches, Match, Matches};
use crate::hooks::{Hooks, NoHooks};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Inputs of one lookup. Also the memoization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Lookup {
    pub root: PathBuf,
    pub relative_path: String,
    pub request: String,
    pub content_type: String,
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// Final response body, after substitution and hooks
    pub body: String,
    /// Selected match, absent when a pre-lookup hook supplied the body
    pub matched: Option<Match>,
}

/// Serves requests from a template directory.
pub struct Simulator {
    root: PathBuf,
    hooks: Arc<dyn Hooks>,
    cache: Option<LookupCache<Lookup, Option<Reply>>>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("root", &self.root)
            .field("cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Simulator`].
pub struct SimulatorBuilder {
    root: PathBuf,
    hooks: Arc<dyn Hooks>,
    cache_entries: Option<usize>,
}

impl SimulatorBuilder {
    pub fn hooks(mut self, hooks: impl Hooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Memoize lookups, keeping at most `max_entries` of them.
    pub fn cache(mut self, max_entries: usize) -> Self {
        self.cache_entries = Some(max_entries);
        self
    }

    /// Memoize lookups with the default capacity when `enabled`.
    pub fn cache_enabled(self, enabled: bool) -> Self {
        if enabled {
            self.cache(DEFAULT_MAX_ENTRIES)
        } else {
            Self {
                cache_entries: None,
                ..self
            }
        }
    }

    pub fn build(self) -> Simulator {
        Simulator {
            root: self.root,
            hooks: self.hooks,
            cache: self.cache_entries.map(LookupCache::new),
        }
    }
}

impl Simulator {
    pub fn builder(root: impl Into<PathBuf>) -> SimulatorBuilder {
        SimulatorBuilder {
            root: root.into(),
            hooks: Arc::new(NoHooks),
            cache_entries: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the response for `request` below `<root>/<relative_path>`.
    ///
    /// Returns `None` when no template matches. When several match, the first
    /// one discovered wins.
    pub fn service(
        &self,
        relative_path: &str,
        request: &str,
        content_type: &str,
    ) -> Result<Option<Reply>, CoreError> {
        let lookup = Lookup {
            root: self.root.clone(),
            relative_path: relative_path.to_string(),
            request: request.to_string(),
            content_type: content_type.to_string(),
        };

        match &self.cache {
            Some(cache) => cache.get_or_try_insert_with(&lookup, || self.lookup(&lookup)),
            None => self.lookup(&lookup),
        }
    }

    /// Every match and non-match for a request, without hooks or caching.
    pub fn diagnose(
        &self,
        relative_path: &str,
        request: &str,
        content_type: &str,
    ) -> Result<Matches, CoreError> {
        find_matches(&self.root, relative_path, request, content_type)
    }

    pub fn cache_metrics(&self) -> Option<CacheMetrics> {
        self.cache.as_ref().map(LookupCache::metrics)
    }

    fn lookup(&self, lookup: &Lookup) -> Result<Option<Reply>, CoreError> {
        debug!("Service called with: {:?}", lookup);

        if let Some(body) = self.hooks.before_lookup(lookup)? {
            debug!("Request hook supplied the response");
            return Ok(Some(Reply {
                body,
                matched: None,
            }));
        }

        let found = find_matches(
            &lookup.root,
            &lookup.relative_path,
            &lookup.request,
            &lookup.content_type,
        )?;
        let Some(selected) = select(found) else {
            return Ok(None);
        };

        let body = self
            .hooks
            .after_match(lookup, &selected, selected.response.clone())?;
        debug!("Service returning response of {}", selected.candidate_path.display());
        Ok(Some(Reply {
            body,
            matched: Some(selected),
        }))
    }
}

/// Apply the selection policy: first match wins, ambiguity and absence are
/// logged.
fn select(found: Matches) -> Option<Match> {
    for no_match in &found.no_matches {
        debug!(
            "No match {}: {}",
            no_match.candidate_path.display(),
            no_match.error
        );
    }

    let count = found.matches.len();
    if count == 0 {
        warn!("No candidates match the request");
        return None;
    }
    if count > 1 {
        let candidates: Vec<_> = found
            .matches
            .iter()
            .map(|m| m.candidate_path.display().to_string())
            .collect();
        warn!("{} candidates match: {:?}", count, candidates);
    }
    found.matches.into_iter().next()
}
