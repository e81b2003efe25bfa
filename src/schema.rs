//! Schema introspection - resource descriptions and their identifying fields.
//!
//! A resource description carries one record shape per operation plus the
//! identifier node tree of the fetch request. The node tree is made of three
//! kinds of node:
//!
//! ```json
//! { "choice": [
//!     { "element": "uuid" },
//!     { "sequence": [ { "element": "pattern" }, { "element": "routePartitionName" } ] }
//! ] }
//! ```
//!
//! `choice` members are mutually exclusive, `sequence` members are supplied
//! together, and `element` is a named leaf field.

use serde_json::{Map, Value};

use crate::error::SchemaShapeError;
use crate::types::{json_type_name, ChoiceGroup, Operation, Record, ShapeKind};

/// Typed node of a fetch-request identifier tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Element(String),
    Sequence(Vec<SchemaNode>),
    Choice(Vec<SchemaNode>),
    /// Wildcard content (`xsd:any`). Legal in descriptions, never an identifier.
    Any,
}

impl SchemaNode {
    /// Parse a node tree from its JSON description.
    ///
    /// # Errors
    ///
    /// Returns `SchemaShapeError` for nodes that are not one of the known kinds.
    pub fn parse(value: &Value) -> Result<Self, SchemaShapeError> {
        parse_node(value, "")
    }
}

/// Enumerate the identifying field combinations below a fetch-request node.
///
/// Sequences become `AllOf`, choices become `OneOf` and elements yield their
/// field name, mirroring the node tree one for one.
///
/// # Errors
///
/// Returns `SchemaShapeError::UnrecognizedNode` when a node is neither a
/// composite nor a named leaf field.
pub fn discover_choice_groups(node: &SchemaNode) -> Result<ChoiceGroup, SchemaShapeError> {
    discover(node, "")
}

fn discover(node: &SchemaNode, path: &str) -> Result<ChoiceGroup, SchemaShapeError> {
    match node {
        SchemaNode::Element(name) => Ok(ChoiceGroup::Field(name.clone())),
        SchemaNode::Sequence(members) => Ok(ChoiceGroup::AllOf(discover_members(
            members,
            &format!("{}/sequence", path),
        )?)),
        SchemaNode::Choice(members) => Ok(ChoiceGroup::OneOf(discover_members(
            members,
            &format!("{}/choice", path),
        )?)),
        SchemaNode::Any => Err(SchemaShapeError::UnrecognizedNode {
            path: path.to_string(),
            found: "any".to_string(),
        }),
    }
}

fn discover_members(
    members: &[SchemaNode],
    path: &str,
) -> Result<Vec<ChoiceGroup>, SchemaShapeError> {
    members
        .iter()
        .enumerate()
        .map(|(i, member)| discover(member, &format!("{}/{}", path, i)))
        .collect()
}

fn parse_node(value: &Value, path: &str) -> Result<SchemaNode, SchemaShapeError> {
    let Some(map) = value.as_object() else {
        return Err(SchemaShapeError::UnrecognizedNode {
            path: path.to_string(),
            found: json_type_name(value).to_string(),
        });
    };

    if let Some(name) = map.get("element") {
        return match name.as_str() {
            Some(name) if !name.is_empty() => Ok(SchemaNode::Element(name.to_string())),
            _ => Err(SchemaShapeError::EmptyFieldName {
                path: format!("{}/element", path),
            }),
        };
    }
    if let Some(members) = map.get("sequence") {
        return parse_members(members, &format!("{}/sequence", path), "sequence")
            .map(SchemaNode::Sequence);
    }
    if let Some(members) = map.get("choice") {
        return parse_members(members, &format!("{}/choice", path), "choice")
            .map(SchemaNode::Choice);
    }
    if map.contains_key("any") {
        return Ok(SchemaNode::Any);
    }

    let found = map.keys().next().cloned().unwrap_or_else(|| "{}".to_string());
    Err(SchemaShapeError::UnrecognizedNode {
        path: path.to_string(),
        found,
    })
}

fn parse_members(
    value: &Value,
    path: &str,
    kind: &'static str,
) -> Result<Vec<SchemaNode>, SchemaShapeError> {
    let Some(items) = value.as_array() else {
        return Err(SchemaShapeError::UnrecognizedNode {
            path: path.to_string(),
            found: json_type_name(value).to_string(),
        });
    };
    if items.is_empty() {
        return Err(SchemaShapeError::EmptyComposite {
            path: path.to_string(),
            kind,
        });
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_node(item, &format!("{}/{}", path, i)))
        .collect()
}

/// Per-resource-type description: one shape per operation plus identifiers.
///
/// Built fresh from a description value; the choice groups are derived once
/// at construction and reused by every call on the resource.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    resource: String,
    create: Option<Record>,
    fetch_request: Option<SchemaNode>,
    fetch_response: Option<Record>,
    update: Option<Record>,
    list_criteria: Vec<String>,
    list_response: Option<Record>,
    actions: Vec<Operation>,
    choices: Option<ChoiceGroup>,
}

impl ResourceSchema {
    /// Build a schema from a description value.
    ///
    /// Description keys are `resource`, `create`, `fetchRequest`,
    /// `fetchResponse`, `update`, `listCriteria`, `listResponse` and
    /// `actions`; only `resource` is required.
    ///
    /// # Errors
    ///
    /// Returns `SchemaShapeError` when a shape is not an object or the
    /// identifier tree contains an unknown node.
    pub fn from_value(description: &Value) -> Result<Self, SchemaShapeError> {
        let map = description
            .as_object()
            .ok_or_else(|| SchemaShapeError::InvalidDescription {
                message: format!(
                    "expected object, got {}",
                    json_type_name(description)
                ),
            })?;

        let resource = map
            .get("resource")
            .and_then(|r| r.as_str())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| SchemaShapeError::InvalidDescription {
                message: "missing resource name".to_string(),
            })?
            .to_string();

        let fetch_request = map
            .get("fetchRequest")
            .map(SchemaNode::parse)
            .transpose()?;
        let choices = fetch_request
            .as_ref()
            .map(discover_choice_groups)
            .transpose()?;

        let list_criteria = match map.get("listCriteria") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(String::from).ok_or_else(|| {
                        SchemaShapeError::InvalidDescription {
                            message: "listCriteria must contain strings".to_string(),
                        }
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(SchemaShapeError::InvalidDescription {
                    message: format!(
                        "listCriteria must be an array, got {}",
                        json_type_name(other)
                    ),
                })
            }
        };

        let actions = match map.get("actions") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .and_then(Operation::parse_action)
                        .ok_or_else(|| SchemaShapeError::InvalidDescription {
                            message: format!("unknown device action {}", item),
                        })
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(SchemaShapeError::InvalidDescription {
                    message: format!("actions must be an array, got {}", json_type_name(other)),
                })
            }
        };

        Ok(Self {
            create: shape_field(map, "create")?,
            fetch_response: shape_field(map, "fetchResponse")?,
            update: shape_field(map, "update")?,
            list_response: shape_field(map, "listResponse")?,
            resource,
            fetch_request,
            list_criteria,
            actions,
            choices,
        })
    }

    /// Resource type name, e.g. `phone`.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Identifier node tree of the fetch request.
    pub fn fetch_request(&self) -> Option<&SchemaNode> {
        self.fetch_request.as_ref()
    }

    /// Identifying field combinations for this resource.
    pub fn choice_groups(&self) -> Option<&ChoiceGroup> {
        self.choices.as_ref()
    }

    /// Search criteria accepted by the list operation.
    pub fn list_criteria(&self) -> &[String] {
        &self.list_criteria
    }

    /// Device actions the resource accepts.
    pub fn actions(&self) -> &[Operation] {
        &self.actions
    }

    /// Raw shape for an operation, type names at the leaves.
    pub fn shape(&self, kind: ShapeKind) -> Option<&Record> {
        match kind {
            ShapeKind::Create => self.create.as_ref(),
            ShapeKind::FetchResponse => self.fetch_response.as_ref(),
            ShapeKind::Update => self.update.as_ref(),
            ShapeKind::ListResponse => self.list_response.as_ref(),
        }
    }

    /// Whether the description carries what `operation` needs.
    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Create => self.create.is_some(),
            Operation::Fetch | Operation::Remove => self.choices.is_some(),
            Operation::Update => self.update.is_some() && self.choices.is_some(),
            Operation::List => self.list_response.is_some(),
            Operation::Apply | Operation::Restart | Operation::Reset => {
                self.actions.contains(&operation) && self.choices.is_some()
            }
        }
    }

    /// Empty model for a shape.
    ///
    /// Leaves are blanked to `""` unless `include_types` is set, in which case
    /// each leaf keeps its remote type name (e.g. `"String128"`).
    pub fn model(&self, kind: ShapeKind, include_types: bool) -> Option<Record> {
        let shape = self.shape(kind)?;
        if include_types {
            Some(shape.clone())
        } else {
            Some(blank_record(shape))
        }
    }
}

fn shape_field(map: &Map<String, Value>, key: &str) -> Result<Option<Record>, SchemaShapeError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(shape)) => Ok(Some(shape.clone())),
        Some(other) => Err(SchemaShapeError::InvalidDescription {
            message: format!("{} shape must be an object, got {}", key, json_type_name(other)),
        }),
    }
}

fn blank_record(shape: &Record) -> Record {
    shape
        .iter()
        .map(|(k, v)| (k.clone(), blank_value(v)))
        .collect()
}

fn blank_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(blank_record(map)),
        Value::Array(items) => Value::Array(items.iter().map(blank_value).collect()),
        _ => Value::String(String::new()),
    }
}
