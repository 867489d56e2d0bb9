//! Outcome of comparing a template against a candidate document.
//!
//! Every matcher returns exactly one [`MatchResult`] per comparison: either the
//! ordered capture [`Groups`] on success, or a [`Mismatch`] describing where and
//! why the two documents diverged.

use serde::Serialize;
use std::fmt;

/// Captured substrings in the order their capture groups were encountered.
pub type Groups = Vec<String>;

/// Result of a single template/candidate comparison.
pub type MatchResult = Result<Groups, Mismatch>;

/// One step into a compared structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key or (namespace-qualified) element tag
    Key(String),
    /// List position
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Diagnostic for a template that does not match a candidate.
///
/// `path` locates the divergence inside the compared structure; an empty path
/// means the whole document (parse failures, top-level type mismatches).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct Mismatch {
    pub path: Vec<PathSegment>,
    pub this: Option<String>,
    pub that: Option<String>,
    pub message: String,
}

impl Mismatch {
    pub fn new(
        path: &[PathSegment],
        this: Option<String>,
        that: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.to_vec(),
            this,
            that,
            message: message.into(),
        }
    }

    /// Mismatch of the whole document, with both sides recorded verbatim.
    pub fn at_root(this: &str, that: &str, message: impl Into<String>) -> Self {
        Self::new(
            &[],
            Some(this.to_string()),
            Some(that.to_string()),
            message,
        )
    }

    /// Path rendered as `a/b/0`, for log lines.
    pub fn location(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }
}
