//! Segments: pure mappings from vendor JSON into the normalized schema.
//!
//! Every segment is total. Absent or mistyped source fields resolve to the
//! documented default through the ordered lookup helpers below, never through
//! ad hoc conditional chains. A path is a slice of keys; numeric keys index
//! into arrays, and keys may themselves contain dots (`"webapp.user-detail"`).

pub mod media;
pub mod metrics;
pub mod tweet;
pub mod user;
pub mod video;

use serde_json::Value;

/// Path of object keys / array indices into a JSON document.
pub type Path<'a> = &'a [&'a str];

/// Follow `path` from `value`. JSON `null` counts as absent.
pub fn lookup<'v>(value: &'v Value, path: Path<'_>) -> Option<&'v Value> {
    path.iter()
        .try_fold(value, |cur, key| match cur {
            Value::Object(map) => map.get(*key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .filter(|v| !v.is_null())
}

/// First candidate path that resolves to a present value.
pub fn first_of<'v>(value: &'v Value, candidates: &[Path<'_>]) -> Option<&'v Value> {
    candidates.iter().find_map(|path| lookup(value, path))
}

/// Render a scalar as text. Empty strings count as absent.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First candidate that yields non-empty text.
pub fn first_text(value: &Value, candidates: &[Path<'_>]) -> Option<String> {
    candidates
        .iter()
        .find_map(|path| lookup(value, path).and_then(as_text))
}

/// Text at `path`, or `default`.
pub fn text_or(value: &Value, path: Path<'_>, default: &str) -> String {
    first_text(value, &[path]).unwrap_or_else(|| default.to_string())
}

/// Text at `path`, or the empty string.
pub fn text(value: &Value, path: Path<'_>) -> String {
    text_or(value, path, "")
}

/// Optional text at `path` (absent and empty both yield `None`).
pub fn opt_text(value: &Value, path: Path<'_>) -> Option<String> {
    first_text(value, &[path])
}

/// Boolean at `path`; anything other than JSON `true` is `false`.
pub fn flag(value: &Value, path: Path<'_>) -> bool {
    lookup(value, path).and_then(Value::as_bool).unwrap_or(false)
}

/// Coerce a JSON scalar to a non-negative integer.
///
/// Numbers and numeric strings convert (fractions truncate); negatives,
/// non-numeric strings, arrays, objects and absence all become 0.
pub fn coerce_count(value: Option<&Value>) -> u64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(float_count)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(float_count))
        }
        Some(Value::Bool(true)) => Some(1),
        _ => None,
    };
    parsed.unwrap_or(0)
}

fn float_count(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f.trunc() as u64
    } else {
        0
    }
}

/// Counter at `path`, 0 when absent or non-numeric.
pub fn count(value: &Value, path: Path<'_>) -> u64 {
    coerce_count(lookup(value, path))
}

/// Array at `path`, or an empty slice.
pub fn items<'v>(value: &'v Value, path: Path<'_>) -> &'v [Value] {
    lookup(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
