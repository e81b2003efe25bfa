//! Structural validation of resource descriptions.
//!
//! Descriptions are checked against an embedded JSON Schema before they are
//! introspected, so a malformed file reports every problem with a JSON
//! Pointer instead of stopping at the first one.

use std::sync::OnceLock;

use serde_json::{json, Value};

use crate::error::{DescriptionIssue, LoadError};

/// JSON Schema every resource description must satisfy.
pub fn description_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "required": ["resource"],
            "properties": {
                "resource": { "type": "string", "minLength": 1 },
                "create": { "$ref": "#/$defs/shape" },
                "fetchRequest": { "$ref": "#/$defs/node" },
                "fetchResponse": { "$ref": "#/$defs/shape" },
                "update": { "$ref": "#/$defs/shape" },
                "listCriteria": {
                    "type": "array",
                    "items": { "type": "string", "minLength": 1 }
                },
                "listResponse": { "$ref": "#/$defs/shape" },
                "actions": {
                    "type": "array",
                    "items": { "enum": ["apply", "restart", "reset"] },
                    "uniqueItems": true
                }
            },
            "additionalProperties": false,
            "$defs": {
                "shape": { "type": ["object", "null"] },
                "node": {
                    "type": "object",
                    "minProperties": 1,
                    "maxProperties": 1,
                    "properties": {
                        "element": { "type": "string", "minLength": 1 },
                        "sequence": {
                            "type": "array",
                            "minItems": 1,
                            "items": { "$ref": "#/$defs/node" }
                        },
                        "choice": {
                            "type": "array",
                            "minItems": 1,
                            "items": { "$ref": "#/$defs/node" }
                        },
                        "any": {}
                    },
                    "additionalProperties": false
                }
            }
        })
    })
}

/// Validate a description value against [`description_schema`].
///
/// # Errors
///
/// Returns `LoadError::InvalidDescription` listing every issue found.
pub fn validate_description(description: &Value) -> Result<(), LoadError> {
    let validator = jsonschema::validator_for(description_schema()).map_err(|e| {
        LoadError::InvalidDescription {
            issues: vec![DescriptionIssue {
                path: String::new(),
                message: e.to_string(),
            }],
        }
    })?;

    let issues: Vec<DescriptionIssue> = validator
        .iter_errors(description)
        .map(|e| DescriptionIssue {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(LoadError::InvalidDescription { issues })
    }
}
