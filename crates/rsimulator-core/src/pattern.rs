//! Template pattern dialect and full-match evaluation.
//!
//! Templates are mostly literal JSON, XML or text with a few capture groups
//! sprinkled in, so the dialect is lenient about characters that are literal in
//! those documents but special to the `regex` crate:
//!
//! - `{` only opens a counted repetition when followed by `n}`, `n,}`, `n,m}` or
//!   `,m}`; everywhere else it is a literal brace.
//! - Inside a character class `[` is literal (classes do not nest) and `&`, `~`
//!   are plain characters rather than set operators.
//! - `\Z` anchors at the end of input.
//! - `\<` and `\>` are escaped angle brackets, not word boundaries.
//!
//! Matching is always a full match with `.` matching newlines and `^`/`$`
//! matching at line boundaries.

use crate::result::Groups;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::Arc;

/// Upper bound on memoized compiled patterns before the table is reset.
const COMPILED_CACHE_LIMIT: usize = 4096;

/// Compiled patterns keyed by template text. `None` records a pattern that
/// does not compile so it is not retried.
static COMPILED: Lazy<Mutex<HashMap<String, Option<Arc<Regex>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Full-match `text` against `pattern`.
///
/// Returns the captured groups in left-to-right order, or `None` when the text
/// does not match or the pattern is not valid in the template dialect. Groups
/// that did not participate in the match are reported as empty strings.
pub fn full_match(pattern: &str, text: &str) -> Option<Groups> {
    let regex = compile(pattern)?;
    let captures = regex.captures(text)?;
    Some(
        captures
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect(),
    )
}

/// Identical strings match without captures; otherwise fall back to
/// [`full_match`].
pub fn equal_or_full_match(pattern: &str, text: &str) -> Option<Groups> {
    if pattern == text {
        return Some(Groups::new());
    }
    full_match(pattern, text)
}

fn compile(pattern: &str) -> Option<Arc<Regex>> {
    if let Some(cached) = COMPILED.lock().get(pattern) {
        return cached.clone();
    }

    let compiled = translate(pattern).and_then(|translated| {
        RegexBuilder::new(&format!(r"(?ms)\A(?:{translated})\z"))
            .build()
            .map(Arc::new)
            .map_err(|e| tracing::trace!("Pattern does not compile: {}", e))
            .ok()
    });

    let mut table = COMPILED.lock();
    if table.len() >= COMPILED_CACHE_LIMIT {
        table.clear();
    }
    table.insert(pattern.to_string(), compiled.clone());
    compiled
}

/// Rewrite a template pattern into `regex` crate syntax.
///
/// Returns `None` for patterns that can never compile: a trailing backslash,
/// an unterminated class or unbalanced parentheses.
pub(crate) fn translate(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut depth = 0usize;
    let mut in_class = false;
    let mut class_start = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            let next = *chars.get(i + 1)?;
            i += 2;
            class_start = false;
            if next == 'Z' && !in_class {
                out.push_str(r"\z");
                continue;
            }
            if matches!(next, '<' | '>') {
                out.push(next);
                continue;
            }
            out.push('\\');
            out.push(next);
            // \p{..}, \P{..} and \x{..} carry their own braces
            if matches!(next, 'p' | 'P' | 'x') && chars.get(i) == Some(&'{') {
                let close = chars[i..].iter().position(|&ch| ch == '}')?;
                out.extend(&chars[i..=i + close]);
                i += close + 1;
            }
            continue;
        }

        if in_class {
            match c {
                ']' if !class_start => in_class = false,
                '[' | '&' | '~' => out.push('\\'),
                '-' if chars.get(i + 1) == Some(&'-') => out.push('\\'),
                _ => {}
            }
            out.push(c);
            class_start = false;
            i += 1;
            continue;
        }

        match c {
            '[' => {
                out.push('[');
                in_class = true;
                class_start = true;
                if chars.get(i + 1) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
            }
            '(' => {
                depth += 1;
                out.push('(');
            }
            ')' => {
                depth = depth.checked_sub(1)?;
                out.push(')');
            }
            '{' => match counted_repetition(&chars[i..]) {
                Some((quantifier, consumed)) => {
                    out.push_str(&quantifier);
                    i += consumed;
                    continue;
                }
                None => out.push_str(r"\{"),
            },
            '}' => out.push_str(r"\}"),
            _ => out.push(c),
        }
        i += 1;
    }

    if in_class || depth != 0 {
        return None;
    }
    Some(out)
}

/// Parse `{n}`, `{n,}`, `{n,m}` or `{,m}` at the start of `chars`.
///
/// Returns the quantifier in `regex` syntax and the number of chars consumed.
fn counted_repetition(chars: &[char]) -> Option<(String, usize)> {
    let mut i = 1;
    let lower: String = chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
    i += lower.len();

    let upper = if chars.get(i) == Some(&',') {
        i += 1;
        let upper: String = chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        i += upper.len();
        Some(upper)
    } else {
        None
    };

    if chars.get(i) != Some(&'}') {
        return None;
    }

    let quantifier = match upper {
        None if lower.is_empty() => return None,
        None => format!("{{{lower}}}"),
        Some(upper) => {
            let lower = if lower.is_empty() { "0" } else { &lower };
            format!("{{{lower},{upper}}}")
        }
    };
    Some((quantifier, i + 1))
}
