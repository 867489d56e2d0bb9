//! XML template matching.
//!
//! Identical documents and whole-document patterns are accepted before any
//! parsing. Otherwise both documents are parsed into [`XmlElement`] trees and
//! compared element by element. At each element the canonical renderings are
//! tried as a pattern first; failing that, four checks run in order and the
//! first failure is reported:
//!
//! 1. namespace-qualified tag names are equal,
//! 2. attributes match (looked up by name, values as patterns),
//! 3. stripped leading text matches as a pattern,
//! 4. children match pairwise in document order.

mod tree;

pub use tree::{XmlElement, XmlName};

use super::Matcher;
use crate::pattern::{equal_or_full_match, full_match};
use crate::result::{Groups, MatchResult, Mismatch, PathSegment};

/// Namespace-aware structural XML matcher with regex-bearing values.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlMatcher;

impl Matcher for XmlMatcher {
    fn matches(&self, template: &str, candidate: &str) -> MatchResult {
        if template == candidate {
            return Ok(Groups::new());
        }
        if let Some(groups) = full_match(template, candidate) {
            return Ok(groups);
        }

        let this = parse("this", template, template, candidate)?;
        let that = parse("that", candidate, template, candidate)?;
        compare(&this, &that, &[])
    }
}

fn parse(name: &str, raw: &str, template: &str, candidate: &str) -> Result<XmlElement, Mismatch> {
    XmlElement::parse(strip_prolog(raw)).map_err(|e| {
        Mismatch::at_root(
            template,
            candidate,
            format!("Cannot parse \"{name}\": \"{raw}\", {e}"),
        )
    })
}

/// Drop surrounding whitespace and a leading `<?...?>` declaration on the
/// first line.
fn strip_prolog(xml: &str) -> &str {
    let trimmed = xml.trim();
    if let Some(rest) = trimmed.strip_prefix("<?") {
        let first_line = rest.split('\n').next().unwrap_or(rest);
        if let Some(end) = first_line.rfind("?>").filter(|&end| end > 0) {
            return rest[end + 2..].trim();
        }
    }
    trimmed
}

fn compare(this: &XmlElement, that: &XmlElement, path: &[PathSegment]) -> MatchResult {
    if let Some(groups) = equal_or_full_match(&this.canonical(), &that.canonical()) {
        return Ok(groups);
    }

    let mut groups = Groups::new();
    for check in [compare_names, compare_attributes, compare_text, compare_children] {
        groups.extend(check(this, that, path)?);
    }
    Ok(groups)
}

fn mismatch(
    this: &XmlElement,
    that: &XmlElement,
    path: &[PathSegment],
    message: String,
) -> Mismatch {
    Mismatch::new(
        path,
        Some(this.canonical()),
        Some(that.canonical()),
        message,
    )
}

fn compare_names(this: &XmlElement, that: &XmlElement, path: &[PathSegment]) -> MatchResult {
    if this.name == that.name {
        return Ok(Groups::new());
    }
    Err(mismatch(
        this,
        that,
        path,
        format!("Names not matching: \"{}\" != \"{}\"", this.name, that.name),
    ))
}

fn compare_attributes(this: &XmlElement, that: &XmlElement, path: &[PathSegment]) -> MatchResult {
    if this.attribute_map() == that.attribute_map() {
        return Ok(Groups::new());
    }
    if this.attributes.len() != that.attributes.len() {
        return Err(mismatch(
            this,
            that,
            path,
            "Different number of attributes".to_string(),
        ));
    }

    let mut groups = Groups::new();
    for (name, this_value) in &this.attributes {
        let that_value = that.attribute(name).unwrap_or_default();
        match equal_or_full_match(this_value, that_value) {
            Some(attribute_groups) => groups.extend(attribute_groups),
            None => {
                return Err(mismatch(
                    this,
                    that,
                    path,
                    format!(
                        "Attribute values not matching for {name}: \"{this_value}\" != \"{that_value}\""
                    ),
                ))
            }
        }
    }
    Ok(groups)
}

fn compare_text(this: &XmlElement, that: &XmlElement, path: &[PathSegment]) -> MatchResult {
    let (this_text, that_text) = (this.text.trim(), that.text.trim());
    equal_or_full_match(this_text, that_text).ok_or_else(|| {
        mismatch(
            this,
            that,
            path,
            format!("Text not matching: \"{this_text}\" != \"{that_text}\""),
        )
    })
}

fn compare_children(this: &XmlElement, that: &XmlElement, path: &[PathSegment]) -> MatchResult {
    if this.children.len() != that.children.len() {
        return Err(mismatch(
            this,
            that,
            path,
            "Different number of children".to_string(),
        ));
    }

    let mut child_path = path.to_vec();
    child_path.push(PathSegment::Key(this.name.to_string()));

    let mut groups = Groups::new();
    for (this_child, that_child) in this.children.iter().zip(&that.children) {
        groups.extend(compare(this_child, that_child, &child_path)?);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(values: &[&str]) -> MatchResult {
        Ok(values.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_equal_strings() {
        assert_eq!(XmlMatcher.matches("<x/>", "<x/>"), groups(&[]));
    }

    #[test]
    fn test_with_and_without_prolog() {
        assert_eq!(
            XmlMatcher.matches(r#"<?xml version="1.0" encoding="UTF-8"?><x/>"#, "<x/>"),
            groups(&[])
        );
    }

    #[test]
    fn test_insignificant_whitespace() {
        assert_eq!(
            XmlMatcher.matches(
                r#"<?xml version="1.0" encoding="UTF-8"?><x><y>y</y></x>"#,
                "<x>\n<y>    y  \n</y></x>\n"
            ),
            groups(&[])
        );
    }

    #[test]
    fn test_attribute_order_and_patterns() {
        assert_eq!(
            XmlMatcher.matches(
                r#"<x x1=".*" x2="([\w]+)"><y y="([a-z0-9]{1})">y</y><z z="z">(.*)</z></x>"#,
                r#"<x x2="x2" x1="x1"><y y="y">y</y><z z="z">z</z></x>"#
            ),
            groups(&["x2", "y", "z"])
        );
    }

    #[test]
    fn test_attribute_groups_follow_template_order() {
        assert_eq!(
            XmlMatcher.matches(
                r#"<r b="(x)" a="(y)"><c/>tail</r>"#,
                r#"<r a="y" b="x"><c/>other</r>"#
            ),
            groups(&["x", "y"])
        );
    }

    #[test]
    fn test_whole_document_patterns() {
        assert_eq!(
            XmlMatcher.matches("<x>(.*)</x>", "<x><y><z>z</z></y></x>"),
            groups(&["<y><z>z</z></y>"])
        );
        assert_eq!(
            XmlMatcher.matches("(.*)", "<x>\n<y><z>z</z></y></x>"),
            groups(&["<x>\n<y><z>z</z></y></x>"])
        );
        assert_eq!(
            XmlMatcher.matches("<x><y>(Tove)</y></x>", "<x><y>Tove</y></x>"),
            groups(&["Tove"])
        );
    }

    #[test]
    fn test_namespace_prefixes_and_order() {
        assert_eq!(
            XmlMatcher.matches(
                r#"<x xmlns:a="z" targetNamespace="y" xmlns="x"><a:a a="(1)" b="2"><a:b/></a:a></x>"#,
                r#"<x xmlns="x" targetNamespace="y" xmlns:z="z"><z:a b="2" a="1"><z:b/></z:a></x>"#
            ),
            groups(&["1"])
        );
    }

    #[test]
    fn test_parse_error_this() {
        let mismatch = XmlMatcher.matches("<x>", "<x/>").unwrap_err();
        assert!(mismatch.path.is_empty());
        assert_eq!(mismatch.this.as_deref(), Some("<x>"));
        assert!(mismatch.message.starts_with(r#"Cannot parse "this": "<x>", "#));
    }

    #[test]
    fn test_parse_error_that() {
        let mismatch = XmlMatcher.matches("<x/>", "<x>").unwrap_err();
        assert!(mismatch.message.starts_with(r#"Cannot parse "that": "<x>", "#));
    }

    #[test]
    fn test_different_number_of_attributes() {
        let mismatch = XmlMatcher.matches(r#"<x y="1"/>"#, "<x/>").unwrap_err();
        assert!(mismatch.path.is_empty());
        assert_eq!(mismatch.message, "Different number of attributes");
    }

    #[test]
    fn test_attribute_value_mismatch() {
        let mismatch = XmlMatcher
            .matches(r#"<p><q a="[0-9]+"/></p>"#, r#"<p><q a="x"/></p>"#)
            .unwrap_err();
        assert_eq!(mismatch.path, vec![PathSegment::from("p")]);
        assert_eq!(
            mismatch.message,
            r#"Attribute values not matching for a: "[0-9]+" != "x""#
        );
    }

    #[test]
    fn test_missing_attribute_compares_against_empty() {
        let mismatch = XmlMatcher
            .matches(r#"<x a="1"/>"#, r#"<x b="1"/>"#)
            .unwrap_err();
        assert_eq!(mismatch.message, r#"Attribute values not matching for a: "1" != """#);
    }

    #[test]
    fn test_names_not_matching() {
        let mismatch = XmlMatcher.matches("<x><a/></x>", "<x><b/></x>").unwrap_err();
        assert_eq!(mismatch.path, vec![PathSegment::from("x")]);
        assert_eq!(mismatch.message, r#"Names not matching: "a" != "b""#);
        assert_eq!(mismatch.this.as_deref(), Some("<a></a>"));
    }

    #[test]
    fn test_namespaced_names_not_matching() {
        let mismatch = XmlMatcher
            .matches(r#"<x xmlns="urn:a"/>"#, r#"<x xmlns="urn:b"/>"#)
            .unwrap_err();
        assert_eq!(
            mismatch.message,
            r#"Names not matching: "{urn:a}x" != "{urn:b}x""#
        );
    }

    #[test]
    fn test_children_order_is_significant() {
        assert!(XmlMatcher.matches("<p><a/><b/></p>", "<p><b/><a/></p>").is_err());
        assert_eq!(XmlMatcher.matches("<p><a/><b/></p>", "<p> <a/> <b/> </p>"), groups(&[]));
    }

    #[test]
    fn test_different_number_of_children() {
        let mismatch = XmlMatcher.matches("<p><a/></p>", "<p><a/><a/></p>").unwrap_err();
        assert!(mismatch.path.is_empty());
        assert_eq!(mismatch.message, "Different number of children");
    }

    #[test]
    fn test_text_not_matching() {
        let mismatch = XmlMatcher
            .matches("<p><a>[0-9]+</a></p>", "<p><a>y</a></p>")
            .unwrap_err();
        assert_eq!(mismatch.path, vec![PathSegment::from("p")]);
        assert_eq!(mismatch.message, r#"Text not matching: "[0-9]+" != "y""#);
    }

    #[test]
    fn test_groups_are_attributes_then_text_then_children() {
        assert_eq!(
            XmlMatcher.matches(
                "<r k=\"(a)\">\n  (b)\n  <c>(c)</c>\n</r>",
                "<r k=\"a\">b<c>c</c>tail</r>"
            ),
            groups(&["a", "b", "c"])
        );
    }

    #[test]
    fn test_strip_prolog() {
        assert_eq!(strip_prolog("  <?xml version=\"1.0\"?>\n<x/> "), "<x/>");
        assert_eq!(strip_prolog("<x/>"), "<x/>");
    }
}
