//! Candidate discovery and matching.
//!
//! Request templates live anywhere below `<root>/<relative_path>` as
//! `<name>Request.<ext>`, each paired with a `<name>Response.<ext>` in the
//! same directory. Every candidate is evaluated; nothing short-circuits on the
//! first match.

use crate::error::CoreError;
use crate::matcher::matcher_for;
use crate::result::Mismatch;
use crate::template::substitute;
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A candidate template that matched the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub request: String,
    pub candidate_path: PathBuf,
    /// Raw request template text
    pub candidate: String,
    pub response_path: PathBuf,
    /// Response template before substitution
    pub response_raw: String,
    pub response: String,
}

/// A candidate template that did not match, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoMatch {
    pub request: String,
    pub candidate_path: PathBuf,
    pub candidate: String,
    pub error: Mismatch,
}

/// Matches and non-matches of one lookup, both in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Matches {
    pub matches: Vec<Match>,
    pub no_matches: Vec<NoMatch>,
}

/// Match `request` against every `*Request.<content_type>` file below
/// `root/relative_path`.
///
/// `content_type` doubles as the file extension and selects the matcher;
/// unknown types are matched as text.
pub fn find_matches(
    root: &Path,
    relative_path: &str,
    request: &str,
    content_type: &str,
) -> Result<Matches, CoreError> {
    let matcher = matcher_for(content_type);
    let mut found = Matches::default();

    for candidate_path in candidates(root, relative_path, content_type)? {
        let candidate = read(&candidate_path)?;
        let result = matcher.matches_bytes(&candidate, request.as_bytes());
        let candidate = String::from_utf8_lossy(&candidate).into_owned();

        match result {
            Ok(groups) => {
                debug!(
                    "Candidate {} matched with groups {:?}",
                    candidate_path.display(),
                    groups
                );
                let response_path = response_path(&candidate_path);
                let response_raw = String::from_utf8_lossy(&read(&response_path)?).into_owned();
                let response = substitute(&response_raw, &groups);
                found.matches.push(Match {
                    request: request.to_string(),
                    candidate_path,
                    candidate,
                    response_path,
                    response_raw,
                    response,
                });
            }
            Err(error) => {
                debug!(
                    "Candidate {} did not match at [{}]: {}",
                    candidate_path.display(),
                    error.location(),
                    error
                );
                found.no_matches.push(NoMatch {
                    request: request.to_string(),
                    candidate_path,
                    candidate,
                    error,
                });
            }
        }
    }

    Ok(found)
}

/// Sibling response file: `Request` becomes `Response` in the file name.
pub fn response_path(candidate_path: &Path) -> PathBuf {
    let file_name = candidate_path
        .file_name()
        .map(|name| name.to_string_lossy().replace("Request", "Response"))
        .unwrap_or_default();
    candidate_path.with_file_name(file_name)
}

fn candidates(
    root: &Path,
    relative_path: &str,
    content_type: &str,
) -> Result<Vec<PathBuf>, CoreError> {
    let base = root.join(relative_path);
    let base = base.to_string_lossy();
    let pattern = format!(
        "{}/**/*Request.{}",
        Pattern::escape(base.trim_end_matches('/')),
        Pattern::escape(content_type)
    );
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let mut paths = Vec::new();
    for entry in glob::glob_with(&pattern, options)? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable template location: {}", e),
        }
    }
    debug!("Found {} candidates for {}", paths.len(), pattern);
    Ok(paths)
}

fn read(path: &Path) -> Result<Vec<u8>, CoreError> {
    std::fs::read(path).map_err(|e| CoreError::io(path, e))
}
