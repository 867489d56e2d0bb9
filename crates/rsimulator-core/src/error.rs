use std::path::PathBuf;

/// Failures of a lookup that are not match outcomes.
///
/// A template that does not match is a [`Mismatch`](crate::Mismatch) carried
/// by a [`NoMatch`](crate::NoMatch); these errors abort the whole lookup.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid template discovery pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Hook failed: {0}")]
    Hook(String),
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }
}
