//! JSON template matching.
//!
//! Matching proceeds from the coarsest to the finest grain:
//!
//! 1. The raw template is tried as a pattern over the raw candidate, so a bare
//!    regex can stand in for an entire document.
//! 2. Both sides are parsed and compared recursively. At every object, array
//!    and string the canonical renderings (sorted keys, sorted elements) are
//!    tried first, letting one pattern cover a whole sub-structure regardless
//!    of ordering.
//! 3. Otherwise values are compared by kind: objects key by key, arrays
//!    position by position, strings as patterns, everything else by equality.
//!
//! The first divergence found depth-first is reported.

use super::Matcher;
use crate::pattern::equal_or_full_match;
use crate::result::{Groups, MatchResult, Mismatch, PathSegment};
use serde_json::{Map, Value};

/// Structural JSON matcher with regex-bearing leaf values.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMatcher;

impl Matcher for JsonMatcher {
    fn matches(&self, template: &str, candidate: &str) -> MatchResult {
        if let Some(groups) = equal_or_full_match(template, candidate) {
            return Ok(groups);
        }

        let this = load("this", template, template, candidate)?;
        let that = load("that", candidate, template, candidate)?;
        compare(&this, &that, &[])
    }
}

fn load(name: &str, raw: &str, template: &str, candidate: &str) -> Result<Value, Mismatch> {
    serde_json::from_str(raw).map_err(|e| {
        Mismatch::at_root(template, candidate, format!("Cannot load {name} \"{raw}\": {e}"))
    })
}

/// JSON value kinds. Integers and floats are distinct kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl Kind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Boolean,
            Value::Number(n) if n.is_f64() => Kind::Float,
            Value::Number(_) => Kind::Integer,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

fn compare(this: &Value, that: &Value, path: &[PathSegment]) -> MatchResult {
    let (this_kind, that_kind) = (Kind::of(this), Kind::of(that));
    if this_kind != that_kind {
        return Err(Mismatch::new(
            path,
            Some(display(this)),
            Some(display(that)),
            format!(
                "Objects of different types: {}, {}",
                this_kind.name(),
                that_kind.name()
            ),
        ));
    }

    if matches!(this_kind, Kind::Object | Kind::Array | Kind::String) {
        if let Some(groups) = equal_or_full_match(&canonical(this), &canonical(that)) {
            return Ok(groups);
        }
    }

    match (this, that) {
        (Value::Object(this), Value::Object(that)) => compare_objects(this, that, path),
        (Value::Array(this), Value::Array(that)) => compare_arrays(this, that, path),
        (Value::String(this), Value::String(that)) => compare_strings(this, that, path),
        _ => compare_scalars(this, that, path),
    }
}

fn compare_objects(
    this: &Map<String, Value>,
    that: &Map<String, Value>,
    path: &[PathSegment],
) -> MatchResult {
    if this.len() != that.len() {
        return Err(Mismatch::new(path, None, None, "Different number of keys"));
    }

    let mut groups = Groups::new();
    for (key, this_child) in sorted_entries(this) {
        let Some(that_child) = that.get(key) else {
            return Err(Mismatch::new(
                path,
                Some(key.clone()),
                None,
                format!("Keys not matching: \"{key}\""),
            ));
        };

        let mut child_path = path.to_vec();
        child_path.push(PathSegment::Key(key.clone()));
        match compare(this_child, that_child, &child_path) {
            Ok(child_groups) => groups.extend(child_groups),
            // a nested object of the wrong size surfaces at the key holding it
            Err(mismatch) if mismatch.this.is_none() => {
                return Err(Mismatch::new(
                    path,
                    Some(key.clone()),
                    Some(key.clone()),
                    mismatch.message,
                ));
            }
            Err(mismatch) => return Err(mismatch),
        }
    }
    Ok(groups)
}

fn compare_arrays(this: &[Value], that: &[Value], path: &[PathSegment]) -> MatchResult {
    if this.len() != that.len() {
        return Err(Mismatch::new(
            path,
            Some(display_array(this)),
            Some(display_array(that)),
            "Different length of lists",
        ));
    }

    let mut groups = Groups::new();
    for (index, (this_child, that_child)) in this.iter().zip(that).enumerate() {
        let mut child_path = path.to_vec();
        child_path.push(PathSegment::Index(index));
        groups.extend(compare(this_child, that_child, &child_path)?);
    }
    Ok(groups)
}

fn compare_strings(this: &str, that: &str, path: &[PathSegment]) -> MatchResult {
    equal_or_full_match(this, that).ok_or_else(|| {
        Mismatch::new(
            path,
            Some(this.to_string()),
            Some(that.to_string()),
            format!("Values not matching: \"{this}\" != \"{that}\""),
        )
    })
}

fn compare_scalars(this: &Value, that: &Value, path: &[PathSegment]) -> MatchResult {
    if this == that {
        return Ok(Groups::new());
    }
    let (this, that) = (display(this), display(that));
    Err(Mismatch::new(
        path,
        Some(this.clone()),
        Some(that.clone()),
        format!("Values not matching: \"{this}\" != \"{that}\""),
    ))
}

fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// Order-independent rendering: object keys sorted, array elements sorted by
/// their own canonical rendering, recursively.
pub(crate) fn canonical(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            for (i, (key, child)) in sorted_entries(map).into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&quoted(key));
                out.push_str(": ");
                write_canonical(child, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            let mut rendered: Vec<String> = items.iter().map(canonical).collect();
            rendered.sort();
            out.push('[');
            out.push_str(&rendered.join(", "));
            out.push(']');
        }
        Value::String(s) => out.push_str(&quoted(s)),
        other => out.push_str(&other.to_string()),
    }
}

fn quoted(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Human-readable value for diagnostics: strings unquoted, everything else as
/// compact JSON.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_array(items: &[Value]) -> String {
    Value::Array(items.to_vec()).to_string()
}
