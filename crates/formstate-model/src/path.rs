//! Path addressing over JSON values.
//!
//! Paths are dot separated (`contacts.0.email`) and may use brackets for
//! indices (`contacts[0].email`). Numeric segments index arrays; against an
//! object they are looked up as string keys.
//!
//! [`set`] never mutates its input: it returns a new value with intermediate
//! containers created as needed (arrays for numeric segments, objects
//! otherwise). Scalars in the way are replaced. An index more than
//! [`MAX_INDEX_GAP`] past the end of its array is refused: `set` returns
//! the input unchanged and [`try_set`] returns `None`.

use serde_json::{Map, Value};

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(idx) => Self::Index(idx),
            Err(_) => Self::Key(raw.to_string()),
        }
    }
}

/// Split a path into segments. The empty path addresses the root.
pub fn segments(path: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let mut rest = part;
        if let Some(open) = rest.find('[') {
            if open > 0 {
                out.push(Segment::Key(rest[..open].to_string()));
            }
            rest = &rest[open..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(close) = stripped.find(']') else {
                    // unbalanced bracket: keep the remainder as a literal key
                    out.push(Segment::Key(rest.to_string()));
                    break;
                };
                let inner = stripped[..close].trim_matches(|c| c == '"' || c == '\'');
                out.push(Segment::parse(inner));
                rest = &stripped[close + 1..];
            }
        } else {
            out.push(Segment::parse(rest));
        }
    }
    out
}

/// Read the value at `path`.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path)
        .iter()
        .try_fold(root, |current, segment| match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            (Segment::Index(idx), Value::Array(items)) => items.get(*idx),
            (Segment::Index(idx), Value::Object(map)) => map.get(&idx.to_string()),
            _ => None,
        })
}

/// Whether `path` holds nothing (missing or `null`).
pub fn is_unset(root: &Value, path: &str) -> bool {
    get(root, path).is_none_or(Value::is_null)
}

/// Largest number of `null` entries [`set`] pads an array with.
pub const MAX_INDEX_GAP: usize = 1024;

/// Return a copy of `root` with `value` stored at `path`.
#[must_use]
pub fn set(root: &Value, path: &str, value: Value) -> Value {
    try_set(root, path, value).unwrap_or_else(|| root.clone())
}

/// Like [`set`], but `None` when an index is too far past the end of its array.
#[must_use]
pub fn try_set(root: &Value, path: &str, value: Value) -> Option<Value> {
    let mut out = root.clone();
    set_in(&mut out, &segments(path), value).then_some(out)
}

fn set_in(target: &mut Value, segments: &[Segment], value: Value) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return true;
    };
    match (first, target) {
        (Segment::Key(key), Value::Object(map)) => {
            set_in(map.entry(key.clone()).or_insert(Value::Null), rest, value)
        }
        (Segment::Index(idx), Value::Object(map)) => {
            set_in(map.entry(idx.to_string()).or_insert(Value::Null), rest, value)
        }
        (Segment::Index(idx), Value::Array(items)) => {
            if *idx >= items.len() {
                if *idx - items.len() > MAX_INDEX_GAP {
                    return false;
                }
                items.resize(*idx + 1, Value::Null);
            }
            set_in(&mut items[*idx], rest, value)
        }
        (Segment::Index(_), slot) => {
            *slot = Value::Array(Vec::new());
            set_in(slot, segments, value)
        }
        (Segment::Key(_), slot) => {
            *slot = Value::Object(Map::new());
            set_in(slot, segments, value)
        }
    }
}

/// Emptiness used to decide how far a user got through a form.
///
/// `null`, `""`, `[]` and `{}` are empty; numbers and booleans never are.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
