//! Response body templating.
//!
//! Response templates reference captured groups by 1-based position:
//!
//! ```text
//! {"greeting": "${1}", "name": "${2}"}
//! ```
//!
//! Placeholders are replaced one index at a time, in ascending order.
//! Placeholders beyond the number of captured groups are left untouched.

/// Substitute `${1}`, `${2}`, ... in `response` with `groups`.
pub fn substitute(response: &str, groups: &[String]) -> String {
    groups
        .iter()
        .enumerate()
        .fold(response.to_string(), |body, (index, value)| {
            body.replace(&format!("${{{}}}", index + 1), value)
        })
}
