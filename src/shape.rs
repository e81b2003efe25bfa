//! Shape filtering - pruning records to the fields a target shape accepts.

use serde_json::{Map, Value};

use crate::error::ShapeMismatchError;
use crate::sanitize::is_wire_leaf;
use crate::types::{is_truthy, json_type_name, Record};

/// Drop every key of `record` that `shape` does not name.
///
/// With `depth > 1`, values that are records on both sides are filtered
/// recursively with `depth - 1`. Everything else is kept as supplied, so
/// every retained value at the top level equals the input value. A depth of
/// zero returns the record unchanged.
pub fn filter_to_shape(record: &Record, shape: &Record, depth: usize) -> Record {
    if depth == 0 {
        return record.clone();
    }

    let mut result = Map::new();
    for (key, value) in record {
        let Some(shape_value) = shape.get(key) else {
            continue;
        };
        match (value, shape_value) {
            (Value::Object(nested), Value::Object(nested_shape)) if depth > 1 => {
                result.insert(
                    key.clone(),
                    Value::Object(filter_to_shape(nested, nested_shape, depth - 1)),
                );
            }
            _ => {
                result.insert(key.clone(), value.clone());
            }
        }
    }
    result
}

/// Filter a whole response tree to match a full target shape.
///
/// Used to repurpose a fetched record as a create request. Keys are matched
/// by presence in `target` (output follows the target's key order), nested
/// records are filtered recursively, one-element list-of-record shapes are
/// applied to every item, and wire leaf wrappers facing a wire leaf shape
/// pass through unchanged.
///
/// # Errors
///
/// Returns `ShapeMismatchError` when the source gives a scalar (or list)
/// where the target expects a record, or a non-list where it expects a list.
pub fn filter_to_target(source: &Value, target: &Value) -> Result<Value, ShapeMismatchError> {
    filter_value(source, target, "")
}

fn filter_value(source: &Value, target: &Value, path: &str) -> Result<Value, ShapeMismatchError> {
    if is_leaf_pair(source, target) {
        return Ok(source.clone());
    }

    let Some(source_map) = source.as_object() else {
        return Err(ShapeMismatchError {
            path: display_path(path),
            expected: "object",
            actual: json_type_name(source),
        });
    };
    let Some(target_map) = target.as_object() else {
        return Err(ShapeMismatchError {
            path: display_path(path),
            expected: json_type_name(target),
            actual: "object",
        });
    };

    let mut result = Map::new();
    for (key, shape_value) in target_map {
        let Some(value) = source_map.get(key) else {
            continue;
        };
        let child_path = format!("{}/{}", path, key);

        match shape_value {
            Value::Array(items) if is_record_list_shape(items) && is_truthy(value) => {
                let Some(source_items) = value.as_array() else {
                    return Err(ShapeMismatchError {
                        path: child_path,
                        expected: "array",
                        actual: json_type_name(value),
                    });
                };
                let filtered = source_items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| filter_value(item, &items[0], &format!("{}/{}", child_path, i)))
                    .collect::<Result<Vec<_>, _>>()?;
                result.insert(key.clone(), Value::Array(filtered));
            }
            Value::Object(_) if is_truthy(value) => {
                result.insert(key.clone(), filter_value(value, shape_value, &child_path)?);
            }
            _ => {
                result.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(Value::Object(result))
}

/// A wrapper facing a wrapper-shaped target, e.g. `{"uuid", "_value_1"}` on both sides.
fn is_leaf_pair(source: &Value, target: &Value) -> bool {
    is_leaf_like(source) && is_leaf_like(target)
}

fn is_leaf_like(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            is_wire_leaf(map)
                || (map.len() == 1 && map.contains_key(crate::types::DISPLAY_KEY))
        }
        _ => false,
    }
}

fn is_record_list_shape(items: &[Value]) -> bool {
    items.len() == 1 && items[0].is_object()
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Delete the named keys through maps and sequences, `depth` levels deep.
///
/// A depth of zero leaves the value untouched; a sequence counts as one level.
pub fn remove_fields(value: &mut Value, fields: &[&str], depth: usize) {
    if depth == 0 {
        return;
    }
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !fields.contains(&key.as_str()));
            for child in map.values_mut() {
                remove_fields(child, fields, depth - 1);
            }
        }
        Value::Array(items) => {
            for item in items {
                remove_fields(item, fields, depth - 1);
            }
        }
        _ => {}
    }
}

/// Keys present in `a` but absent from `b`, in `a`'s order.
///
/// Comparing a create model against an update model yields the fields an
/// update request cannot carry.
pub fn compare_shapes<'a>(a: &'a Record, b: &Record) -> Vec<&'a str> {
    a.keys()
        .filter(|key| !b.contains_key(*key))
        .map(String::as_str)
        .collect()
}
