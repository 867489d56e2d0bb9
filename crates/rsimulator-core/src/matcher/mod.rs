//! Content-type specific template matchers.
//!
//! A matcher compares a stored request template (which may embed regular
//! expressions) against an incoming request document and returns the captured
//! groups or a diagnostic [`Mismatch`](crate::Mismatch).
//!
//! - `text` - whole-document regex full match over trimmed strings
//! - `json` - canonical fast path plus type-aware recursive comparison
//! - `xml` - canonical fast path plus namespace-aware recursive comparison
//!
//! All matchers are pure: the same inputs always give the same result.

mod json;
mod text;
mod xml;

pub use json::JsonMatcher;
pub use text::TextMatcher;
pub use xml::{XmlElement, XmlMatcher, XmlName};

use crate::result::{MatchResult, Mismatch};

/// Compares a template against a candidate document.
pub trait Matcher: Send + Sync {
    /// Match `candidate` against `template`.
    fn matches(&self, template: &str, candidate: &str) -> MatchResult;

    /// Match raw bytes, rejecting input that is not valid UTF-8 before any
    /// parsing is attempted.
    fn matches_bytes(&self, template: &[u8], candidate: &[u8]) -> MatchResult {
        match (std::str::from_utf8(template), std::str::from_utf8(candidate)) {
            (Ok(template), Ok(candidate)) => self.matches(template, candidate),
            (this, that) => Err(Mismatch::new(
                &[],
                Some(String::from_utf8_lossy(template).into_owned()),
                Some(String::from_utf8_lossy(candidate).into_owned()),
                format!(
                    "Values not strings: \"{}\" != \"{}\"",
                    input_kind(this.is_ok()),
                    input_kind(that.is_ok())
                ),
            )),
        }
    }
}

fn input_kind(is_text: bool) -> &'static str {
    if is_text {
        "str"
    } else {
        "bytes"
    }
}

/// Supported template content types, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Json,
    Text,
    Xml,
}

impl ContentType {
    /// Map a file extension to a content type. Unknown extensions fall back
    /// to [`ContentType::Text`].
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "json" => ContentType::Json,
            "xml" => ContentType::Xml,
            _ => ContentType::Text,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::Text => "txt",
            ContentType::Xml => "xml",
        }
    }

    /// The matcher responsible for this content type.
    pub fn matcher(self) -> &'static dyn Matcher {
        match self {
            ContentType::Json => &JsonMatcher,
            ContentType::Text => &TextMatcher,
            ContentType::Xml => &XmlMatcher,
        }
    }
}

/// Matcher for a (possibly unrecognized) file extension.
pub fn matcher_for(extension: &str) -> &'static dyn Matcher {
    ContentType::from_extension(extension).matcher()
}
