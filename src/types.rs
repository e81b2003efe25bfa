//! Core types shared by the introspection, resolution and shaping passes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered field mapping used for requests, responses and shapes.
pub type Record = Map<String, Value>;

/// Key holding the reference half of a wire leaf wrapper.
pub const REFERENCE_KEY: &str = "uuid";

/// Key holding the display half of a wire leaf wrapper.
pub const DISPLAY_KEY: &str = "_value_1";

/// Surrogate key preferred when resolving identities.
pub const DEFAULT_PREFERRED_KEY: &str = "uuid";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a value counts as "supplied": not null, not false, not zero,
/// and not an empty string or container.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Remote operation verbs.
///
/// The verb doubles as the method prefix on the wire (`add` + `Phone`).
/// `Apply`, `Restart` and `Reset` are device actions: they take an identity
/// and return a reference, and only resources that declare them accept them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[serde(rename = "add")]
    Create,
    #[serde(rename = "get")]
    Fetch,
    Update,
    List,
    Remove,
    Apply,
    Restart,
    Reset,
}

impl Operation {
    /// Parse a device action from its wire verb.
    ///
    /// Returns `None` for unknown verbs and for the record operations.
    pub fn parse_action(s: &str) -> Option<Self> {
        match s {
            "apply" => Some(Operation::Apply),
            "restart" => Some(Operation::Restart),
            "reset" => Some(Operation::Reset),
            _ => None,
        }
    }

    /// Whether this is a device action rather than a record operation.
    pub fn is_action(&self) -> bool {
        matches!(self, Operation::Apply | Operation::Restart | Operation::Reset)
    }

    /// Wire verb for this operation.
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Create => "add",
            Operation::Fetch => "get",
            Operation::Update => "update",
            Operation::List => "list",
            Operation::Remove => "remove",
            Operation::Apply => "apply",
            Operation::Restart => "restart",
            Operation::Reset => "reset",
        }
    }

    /// Remote method name for this operation on a resource type.
    pub fn method_name(&self, resource: &str) -> String {
        format!("{}{}", self.verb(), upcase_first(resource))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// One of the record shapes a resource description carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    Create,
    FetchResponse,
    Update,
    ListResponse,
}

impl ShapeKind {
    /// Parse a shape kind from its kebab-case name.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" | "add" => Some(ShapeKind::Create),
            "fetch-response" | "get" => Some(ShapeKind::FetchResponse),
            "update" => Some(ShapeKind::Update),
            "list-response" | "list" => Some(ShapeKind::ListResponse),
            _ => None,
        }
    }

    /// Operation the shape belongs to.
    pub fn operation(&self) -> Operation {
        match self {
            ShapeKind::Create => Operation::Create,
            ShapeKind::FetchResponse => Operation::Fetch,
            ShapeKind::Update => Operation::Update,
            ShapeKind::ListResponse => Operation::List,
        }
    }
}

/// Identifying field structure of a resource type.
///
/// Mirrors the composite nodes of the fetch request: `AllOf` fields are
/// submitted together, `OneOf` members are mutually exclusive alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceGroup {
    Field(String),
    AllOf(Vec<ChoiceGroup>),
    OneOf(Vec<ChoiceGroup>),
}

impl ChoiceGroup {
    /// Top-level alternatives. Only `OneOf` has several; a bare field or an
    /// `AllOf` group is its own single alternative.
    pub fn alternatives(&self) -> &[ChoiceGroup] {
        match self {
            ChoiceGroup::Field(_) | ChoiceGroup::AllOf(_) => std::slice::from_ref(self),
            ChoiceGroup::OneOf(members) => members,
        }
    }

    /// Every field name below this node, depth first.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            ChoiceGroup::Field(name) => names.push(name),
            ChoiceGroup::AllOf(members) | ChoiceGroup::OneOf(members) => {
                for member in members {
                    member.collect_names(names);
                }
            }
        }
    }

    /// Nested-array rendering, e.g. `["uuid", ["pattern", "routePartitionName"]]`.
    pub fn to_value(&self) -> Value {
        match self {
            ChoiceGroup::Field(name) => Value::String(name.clone()),
            ChoiceGroup::AllOf(members) | ChoiceGroup::OneOf(members) => {
                Value::Array(members.iter().map(ChoiceGroup::to_value).collect())
            }
        }
    }
}

/// Convert the initial character to uppercase.
pub fn upcase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert the initial character to lowercase.
pub fn downcase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `timeZone` -> `time_zone`.
pub fn camel_to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `time_zone` -> `timeZone`.
pub fn snake_to_camel(s: &str) -> String {
    let mut parts = s.split('_');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        out.push_str(&upcase_first(part));
    }
    out
}

/// Strip braces and lowercase a remote UUID so it can be used as a row identifier.
pub fn pkid_from_uuid(uuid: &str) -> String {
    uuid.to_lowercase().replace(['{', '}'], "")
}
