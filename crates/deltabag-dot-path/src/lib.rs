//! Dot-path utilities.
//!
//! Helpers for `a.b.0.c`-style property paths: parsing and formatting,
//! flattening a nested value into a single-level map keyed by dot paths,
//! and expanding such a map back into a nested value. Numeric steps
//! address sequence positions; everything else addresses object keys.
//!
//! # Example
//!
//! ```
//! use deltabag_dot_path::{flatten, expand, get};
//! use serde_json::json;
//!
//! let doc = json!({"user": {"name": "Ada", "tags": ["x", "y"]}});
//!
//! let flat = flatten(&doc);
//! assert_eq!(flat, json!({"user.name": "Ada", "user.tags.0": "x", "user.tags.1": "y"}));
//!
//! assert_eq!(expand(&flat), doc);
//! assert_eq!(get(&doc, "user.tags.1"), Some(&json!("y")));
//! ```

use serde_json::{Map, Value};

pub mod validate;
pub use validate::{validate_dot_path, PathError};

/// A step in a dot path.
pub type PathStep = String;

/// A parsed dot path.
pub type Path = Vec<PathStep>;

/// Parse a dot-path string into its steps.
///
/// The empty string parses to an empty path (the document root).
///
/// # Example
///
/// ```
/// use deltabag_dot_path::parse_dot_path;
///
/// assert_eq!(parse_dot_path("foo.bar"), vec!["foo".to_string(), "bar".to_string()]);
/// assert!(parse_dot_path("").is_empty());
/// ```
pub fn parse_dot_path(path: &str) -> Path {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.').map(|s| s.to_string()).collect()
}

/// Format path steps back into a dot-path string.
///
/// # Example
///
/// ```
/// use deltabag_dot_path::format_dot_path;
///
/// let steps = vec!["foo".to_string(), "0".to_string()];
/// assert_eq!(format_dot_path(&steps), "foo.0");
/// ```
pub fn format_dot_path(steps: &[String]) -> String {
    steps.join(".")
}

/// Get a reference to the value at `path`, or `None` if any step is
/// missing. An empty path addresses the document itself.
pub fn get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(doc);
    }
    let mut current = doc;
    for step in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(step)?,
            Value::Array(arr) => arr.get(step.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

// ── Flatten ───────────────────────────────────────────────────────────────

/// Flatten a nested value into a single-level object keyed by dot paths.
///
/// Sequence positions become numeric steps. Empty objects and arrays are
/// kept whole as leaves, so no information about their existence is lost.
/// Scalars flatten to themselves.
///
/// Keys that already contain dots are concatenated verbatim, which makes
/// flattening idempotent on already-flat maps.
pub fn flatten(value: &Value) -> Value {
    match value {
        Value::Object(map) if map.is_empty() => Value::Object(Map::new()),
        Value::Array(arr) if arr.is_empty() => Value::Object(Map::new()),
        Value::Object(_) | Value::Array(_) => {
            let mut out = Map::new();
            flatten_into(value, String::new(), &mut out);
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn flatten_into(value: &Value, prefix: String, out: &mut Map<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, sub) in map {
                flatten_into(sub, join(&prefix, key), out);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (index, sub) in arr.iter().enumerate() {
                flatten_into(sub, join(&prefix, &index.to_string()), out);
            }
        }
        leaf => {
            out.insert(prefix, leaf.clone());
        }
    }
}

fn join(prefix: &str, step: &str) -> String {
    if prefix.is_empty() {
        step.to_string()
    } else {
        format!("{prefix}.{step}")
    }
}

// ── Expand ────────────────────────────────────────────────────────────────

/// Expand dotted keys back into nested structure.
///
/// Every level with at least one numeric key, and no keys other than
/// numerics and `length`, becomes an array (missing positions are filled
/// with `null`); any other level becomes an object. A `length` entry on
/// an array level sizes the array — truncating or null-padding it — the
/// way sequence nodes carry their tracked length. Values are expanded
/// recursively, so partially-nested input (an object value under a
/// dotted key) normalizes fully. Arrays are expanded element-wise.
/// Scalars expand to themselves.
///
/// When the input contains both a container at `a` and dotted keys under
/// `a.`, the dotted entries are merged into the container; on a direct
/// key collision the later entry wins.
pub fn expand(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = new_container(map.keys().map(|k| first_step(k)));
            for (key, sub) in map {
                let steps: Vec<&str> = key.split('.').collect();
                insert_at(&mut out, &steps, expand(sub));
            }
            out
        }
        Value::Array(arr) => Value::Array(arr.iter().map(expand).collect()),
        other => other.clone(),
    }
}

/// The array-sizing key recognized on numeric levels.
const LENGTH_STEP: &str = "length";

fn first_step(key: &str) -> &str {
    key.split('.').next().unwrap_or(key)
}

fn is_index(step: &str) -> bool {
    !step.is_empty() && step.bytes().all(|b| b.is_ascii_digit())
}

/// Pick the container for a level from the steps addressing it: an array
/// when at least one step is numeric and the rest are numeric or
/// `length`, else an object.
fn new_container<'a>(steps: impl Iterator<Item = &'a str>) -> Value {
    let mut any_numeric = false;
    for step in steps {
        if is_index(step) {
            any_numeric = true;
        } else if step != LENGTH_STEP {
            return Value::Object(Map::new());
        }
    }
    if any_numeric {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn insert_at(target: &mut Value, steps: &[&str], leaf: Value) {
    let (step, rest) = match steps.split_first() {
        Some(split) => split,
        None => return,
    };
    if rest.is_empty() {
        place(target, step, leaf);
    } else {
        // a trailing `length` step means the next level is sized like an array
        let next_array = is_index(rest[0]) || rest[0] == LENGTH_STEP;
        let slot = slot_for(target, step, next_array);
        insert_at(slot, rest, leaf);
    }
}

/// Normalize `target` so it can accept `step`, returning the child slot
/// coerced to a container for the next step. Arrays demote to objects
/// when a non-numeric step lands on them; scalars are replaced.
fn slot_for<'a>(target: &'a mut Value, step: &str, next_numeric: bool) -> &'a mut Value {
    normalize(target, step);
    match target {
        Value::Object(map) => {
            let entry = map.entry(step.to_string()).or_insert(Value::Null);
            if !matches!(entry, Value::Object(_) | Value::Array(_)) {
                *entry = empty_container(next_numeric);
            }
            entry
        }
        Value::Array(arr) => {
            // normalize guarantees the step parses here
            let index: usize = step.parse().unwrap_or(0);
            if index >= arr.len() {
                arr.resize(index + 1, Value::Null);
            }
            let entry = &mut arr[index];
            if !matches!(entry, Value::Object(_) | Value::Array(_)) {
                *entry = empty_container(next_numeric);
            }
            entry
        }
        _ => unreachable!("normalize always yields a container"),
    }
}

fn place(target: &mut Value, step: &str, leaf: Value) {
    // `length` on an array level resizes instead of demoting to an object
    if step == LENGTH_STEP {
        if let (Value::Array(arr), Some(size)) = (&mut *target, leaf.as_u64()) {
            arr.resize(size as usize, Value::Null);
            return;
        }
    }
    normalize(target, step);
    match target {
        Value::Object(map) => match leaf {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = map.get_mut(step) {
                    for (k, v) in incoming {
                        existing.insert(k, v);
                    }
                } else {
                    map.insert(step.to_string(), Value::Object(incoming));
                }
            }
            other => {
                map.insert(step.to_string(), other);
            }
        },
        Value::Array(arr) => {
            let index: usize = step.parse().unwrap_or(0);
            if index >= arr.len() {
                arr.resize(index + 1, Value::Null);
            }
            match (&mut arr[index], leaf) {
                (Value::Object(existing), Value::Object(incoming)) => {
                    for (k, v) in incoming {
                        existing.insert(k, v);
                    }
                }
                (slot, other) => *slot = other,
            }
        }
        _ => unreachable!("normalize always yields a container"),
    }
}

/// Coerce `target` into a container that accepts `step`: scalars become a
/// fresh container, arrays hit with a non-numeric step re-key as objects.
fn normalize(target: &mut Value, step: &str) {
    let numeric = is_index(step);
    let ok = match target {
        Value::Object(_) => true,
        Value::Array(_) => numeric,
        _ => false,
    };
    if ok {
        return;
    }
    *target = match std::mem::take(target) {
        Value::Array(arr) => {
            let mut map = Map::new();
            for (i, v) in arr.into_iter().enumerate() {
                map.insert(i.to_string(), v);
            }
            Value::Object(map)
        }
        _ => empty_container(numeric),
    };
}

fn empty_container(numeric: bool) -> Value {
    if numeric {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
