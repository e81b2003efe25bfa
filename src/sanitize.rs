//! Response sanitizing - collapsing wire leaf wrappers into plain values.
//!
//! The remote protocol represents a foreign-key field as
//! `{"uuid": "{...}", "_value_1": "Display"}`. Sanitizing replaces every such
//! wrapper with its display value, at any depth:
//!
//! ```
//! use axl_client::sanitize;
//! use serde_json::json;
//!
//! let mut record = json!({ "devicePoolName": { "uuid": "{1}", "_value_1": "Default" } });
//! sanitize(&mut record);
//! assert_eq!(record, json!({ "devicePoolName": "Default" }));
//! ```

use serde_json::{Map, Value};

use crate::types::{DISPLAY_KEY, REFERENCE_KEY};

/// Whether a record is a wire leaf wrapper: exactly the reference and display keys.
pub fn is_wire_leaf(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.contains_key(REFERENCE_KEY) && map.contains_key(DISPLAY_KEY)
}

/// Collapse wire leaf wrappers in place, depth first.
///
/// Works the same whether the top-level container is a mapping or a
/// sequence; the top-level value itself is never replaced. Anything that does
/// not match the wrapper pattern is left alone.
pub fn sanitize(value: &mut Value) -> &mut Value {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                sanitize_child(child);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                sanitize_child(item);
            }
        }
        _ => {}
    }
    value
}

/// Owned variant of [`sanitize`].
pub fn sanitized(mut value: Value) -> Value {
    sanitize(&mut value);
    value
}

fn sanitize_child(child: &mut Value) {
    sanitize(child);
    // A display value can itself be wrapper shaped; collapse until stable.
    while let Some(display) = take_display(child) {
        *child = display;
    }
}

fn take_display(value: &mut Value) -> Option<Value> {
    match value {
        Value::Object(map) if is_wire_leaf(map) => map.remove(DISPLAY_KEY),
        _ => None,
    }
}
