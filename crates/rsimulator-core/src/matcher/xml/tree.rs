//! Owned, namespace-resolved XML element tree and its canonical rendering.

use std::collections::BTreeMap;
use std::fmt;
use sxd_document::dom::{ChildOfElement, Element};
use sxd_document::QName;

/// Namespace-qualified name. Displays in Clark notation: `{uri}local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XmlName {
    pub namespace: Option<String>,
    pub local: String,
}

impl XmlName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.to_string(),
        }
    }
}

impl From<QName<'_>> for XmlName {
    fn from(name: QName<'_>) -> Self {
        Self::new(name.namespace_uri(), name.local_part())
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(uri) => write!(f, "{{{uri}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// An element with its attributes, leading text, children and tail text.
///
/// `text` is the character data before the first child element; `tail` is the
/// character data following this element inside its parent. Comments and
/// processing instructions are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: XmlName,
    /// Attributes in document order
    pub attributes: Vec<(XmlName, String)>,
    pub text: String,
    pub tail: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<Self, String> {
        let package = sxd_document::parser::parse(xml).map_err(|e| e.to_string())?;
        let document = package.as_document();
        let root = document
            .root()
            .children()
            .into_iter()
            .find_map(|child| child.element())
            .map(Self::from_dom);
        root.ok_or_else(|| "document has no root element".to_string())
    }

    fn from_dom(element: Element<'_>) -> Self {
        let attributes: Vec<(XmlName, String)> = element
            .attributes()
            .into_iter()
            .map(|attribute| (attribute.name().into(), attribute.value().to_string()))
            .collect();

        let mut text = String::new();
        let mut children: Vec<XmlElement> = Vec::new();
        for child in element.children() {
            match child {
                ChildOfElement::Element(child) => children.push(Self::from_dom(child)),
                ChildOfElement::Text(data) => match children.last_mut() {
                    Some(previous) => previous.tail.push_str(data.text()),
                    None => text.push_str(data.text()),
                },
                ChildOfElement::Comment(_) | ChildOfElement::ProcessingInstruction(_) => {}
            }
        }

        Self {
            name: element.name().into(),
            attributes,
            text,
            tail: String::new(),
            children,
        }
    }

    pub fn attribute(&self, name: &XmlName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attributes as an unordered mapping.
    pub fn attribute_map(&self) -> BTreeMap<&XmlName, &str> {
        self.attributes
            .iter()
            .map(|(name, value)| (name, value.as_str()))
            .collect()
    }

    /// Canonical rendering of this subtree.
    ///
    /// Namespace prefixes are rewritten to `n0`, `n1`, ... in order of first
    /// use and declared where first needed, attributes are sorted by qualified
    /// name, text and tails are whitespace-stripped (and omitted when empty),
    /// and every element is written with an explicit end tag.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut Vec::new(), &[], &mut out);
        out
    }

    fn write_canonical(&self, assigned: &mut Vec<String>, in_scope: &[usize], out: &mut String) {
        let mut declared = Vec::new();
        let tag = prefixed(&self.name, assigned, in_scope, &mut declared);
        let mut sorted: Vec<&(XmlName, String)> = self.attributes.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let attributes: Vec<(String, &str)> = sorted
            .into_iter()
            .map(|(name, value)| {
                (prefixed(name, assigned, in_scope, &mut declared), value.as_str())
            })
            .collect();

        out.push('<');
        out.push_str(&tag);
        for index in &declared {
            out.push_str(&format!(" xmlns:n{index}=\"{}\"", escape_attribute(&assigned[*index])));
        }
        for (name, value) in &attributes {
            out.push_str(&format!(" {name}=\"{}\"", escape_attribute(value)));
        }
        out.push('>');
        out.push_str(&escape_text(self.text.trim()));

        let scope: Vec<usize> = in_scope.iter().chain(&declared).copied().collect();
        for child in &self.children {
            child.write_canonical(assigned, &scope, out);
            out.push_str(&escape_text(child.tail.trim()));
        }

        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
}

/// Render `name` with its rewritten prefix, recording namespaces that need a
/// declaration on the current element.
fn prefixed(
    name: &XmlName,
    assigned: &mut Vec<String>,
    in_scope: &[usize],
    declared: &mut Vec<usize>,
) -> String {
    let Some(uri) = &name.namespace else {
        return name.local.clone();
    };
    let index = match assigned.iter().position(|known| known == uri) {
        Some(index) => index,
        None => {
            assigned.push(uri.clone());
            assigned.len() - 1
        }
    };
    if !in_scope.contains(&index) && !declared.contains(&index) {
        declared.push(index);
    }
    format!("n{index}:{}", name.local)
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolves_namespaces() {
        let root = XmlElement::parse(r#"<a:x xmlns:a="urn:a" y="1"><z>t</z>tail</a:x>"#).unwrap();
        assert_eq!(root.name, XmlName::new(Some("urn:a"), "x"));
        assert_eq!(root.name.to_string(), "{urn:a}x");
        assert_eq!(root.attributes, vec![(XmlName::new(None, "y"), "1".to_string())]);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].text, "t");
        assert_eq!(root.children[0].tail, "tail");
    }

    #[test]
    fn test_default_namespace_is_inherited() {
        let root = XmlElement::parse(r#"<x xmlns="urn:d"><y/></x>"#).unwrap();
        assert_eq!(root.children[0].name, XmlName::new(Some("urn:d"), "y"));
    }

    #[test]
    fn test_text_stops_at_first_child() {
        let root = XmlElement::parse("<x>before<y/>after</x>").unwrap();
        assert_eq!(root.text, "before");
        assert_eq!(root.children[0].tail, "after");
    }

    #[test]
    fn test_parse_error() {
        assert!(XmlElement::parse("<x>").is_err());
        assert!(XmlElement::parse("not xml").is_err());
    }

    #[test]
    fn test_attributes_keep_document_order() {
        let root = XmlElement::parse(r#"<x b="2" a="1" c="3"/>"#).unwrap();
        let names: Vec<&str> = root.attributes.iter().map(|(name, _)| name.local.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_canonical_sorts_attributes_and_strips_text() {
        let root = XmlElement::parse("<x b=\"2\" a=\"1\">\n  <y>  v  </y>\n</x>").unwrap();
        assert_eq!(root.canonical(), r#"<x a="1" b="2"><y>v</y></x>"#);
    }

    #[test]
    fn test_canonical_rewrites_prefixes() {
        let first = XmlElement::parse(r#"<p:x xmlns:p="urn:x"><q:y xmlns:q="urn:y"/></p:x>"#).unwrap();
        let second = XmlElement::parse(r#"<x xmlns="urn:x"><z:y xmlns:z="urn:y"/></x>"#).unwrap();
        assert_eq!(first.canonical(), second.canonical());
        assert_eq!(
            first.canonical(),
            r#"<n0:x xmlns:n0="urn:x"><n1:y xmlns:n1="urn:y"></n1:y></n0:x>"#
        );
    }

    #[test]
    fn test_canonical_escapes() {
        let root = XmlElement::parse(r#"<x a="&quot;&lt;">a &amp; b</x>"#).unwrap();
        assert_eq!(root.canonical(), r#"<x a="&quot;&lt;">a &amp; b</x>"#);
    }
}
