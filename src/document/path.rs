//! Dotted-path access into nested YAML mappings.
//!
//! A path such as `database.pool.size` addresses the key `size` inside the
//! mapping `pool` inside the mapping `database`. Segments are split on every
//! `.`; there is no escaping, so keys containing a literal dot are unreachable.
//!
//! Pure functions over a [`Mapping`]; no I/O.

use serde_yaml::{Mapping, Value};

/// Split a path into its parent segments and final key.
fn split_path(path: &str) -> (Vec<&str>, &str) {
    match path.rsplit_once('.') {
        Some((parents, last)) => (parents.split('.').collect(), last),
        None => (Vec::new(), path),
    }
}

/// Replace `slot` with an empty mapping unless it already is one.
fn ensure_mapping(slot: &mut Value) -> &mut Mapping {
    if !slot.is_mapping() {
        *slot = Value::Mapping(Mapping::new());
    }
    match slot {
        Value::Mapping(mapping) => mapping,
        _ => unreachable!("slot was just replaced with a mapping"),
    }
}

/// Set `value` at `path`, creating intermediate mappings as needed.
///
/// Any intermediate value that is not a mapping is overwritten with an empty
/// mapping (no merging), and whatever sits at the final key is replaced.
pub fn set(root: &mut Mapping, path: &str, value: Value) {
    let (parents, last) = split_path(path);

    let mut current = root;
    for segment in parents {
        let slot = current
            .entry(Value::String(segment.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        current = ensure_mapping(slot);
    }

    current.insert(Value::String(last.to_string()), value);
}

/// Remove the key at `path`.
///
/// Returns `false` without touching the document when an intermediate segment
/// is missing or is not a mapping, or when the final key is absent.
pub fn delete(root: &mut Mapping, path: &str) -> bool {
    let (parents, last) = split_path(path);

    let mut current = root;
    for segment in parents {
        match current.get_mut(segment) {
            Some(Value::Mapping(mapping)) => current = mapping,
            _ => return false,
        }
    }

    // shift_remove keeps the order of the remaining keys
    current.shift_remove(last).is_some()
}

/// Look up the value at `path`.
pub fn get<'a>(root: &'a Mapping, path: &str) -> Option<&'a Value> {
    let (parents, last) = split_path(path);

    let mut current = root;
    for segment in parents {
        match current.get(segment) {
            Some(Value::Mapping(mapping)) => current = mapping,
            _ => return None,
        }
    }

    current.get(last)
}
