//! Plain text matching: the whole template is one pattern.

use super::Matcher;
use crate::pattern::full_match;
use crate::result::{MatchResult, Mismatch};

/// Matches trimmed candidate text against the trimmed template as a pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMatcher;

impl Matcher for TextMatcher {
    fn matches(&self, template: &str, candidate: &str) -> MatchResult {
        full_match(template.trim(), candidate.trim()).ok_or_else(|| {
            Mismatch::at_root(
                template,
                candidate,
                format!("Values not matching: {template} != {candidate}"),
            )
        })
    }
}
