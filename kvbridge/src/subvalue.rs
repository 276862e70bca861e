//! Dotted-path access over a nested [`Value`] stored under a single key
//! (spec §4.4). Path components are plain string keys — no array-index
//! semantics, matching the spec's "no array-index semantics" note.

use std::collections::BTreeMap;

use kvbridge_core::Value;

use crate::error::FacadeError;

/// Walks `value` along `path`, returning a deep copy of whatever is found,
/// or `None` if any intermediate component is absent.
pub(crate) fn get_path(value: &Value, path: &[String]) -> Option<Value> {
    let mut current = value;
    for segment in path {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current.deep_clone())
}

/// Writes `value` into `root` along `path`, creating intermediate mappings
/// for missing components. `root` is typically `Value::Null` when the key
/// didn't exist yet, in which case it's upgraded into a fresh object as
/// traversal reaches it — the same "missing" treatment the spec gives to
/// absent intermediates on read. Traversing into any other non-object value
/// is a [`FacadeError::TypeMismatch`].
pub(crate) fn set_path(root: &mut Value, path: &[String], value: Value) -> Result<(), FacadeError> {
    if path.is_empty() {
        *root = value;
        return Ok(());
    }
    set_path_rec(root, path, value, path)
}

fn set_path_rec(
    current: &mut Value,
    remaining: &[String],
    value: Value,
    full_path: &[String],
) -> Result<(), FacadeError> {
    let (head, rest) = remaining.split_first().expect("checked non-empty by caller");

    if matches!(current, Value::Null) {
        *current = Value::Object(BTreeMap::new());
    }
    let map = match current {
        Value::Object(map) => map,
        _ => {
            return Err(FacadeError::TypeMismatch {
                path: full_path.join("."),
            });
        }
    };

    if rest.is_empty() {
        map.insert(head.clone(), value);
        Ok(())
    } else {
        let entry = map.entry(head.clone()).or_insert(Value::Null);
        set_path_rec(entry, rest, value, full_path)
    }
}
