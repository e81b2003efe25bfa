//! AXL Client
//!
//! Schema-driven upsert resolution and payload shaping for remote
//! configuration services that expose one typed RPC channel per resource
//! type.
//!
//! Given a resource description, this library works out how a resource may
//! be addressed, reduces caller data to exactly one legal identifier set,
//! filters payloads down to what each operation accepts, collapses wire-level
//! leaf wrappers in responses, and makes a resource match caller data whether
//! or not it exists yet.
//!
//! # Example
//!
//! ```
//! use axl_client::{resolve_identity, ResourceSchema};
//! use serde_json::json;
//!
//! let schema = ResourceSchema::from_value(&json!({
//!     "resource": "line",
//!     "fetchRequest": {
//!         "choice": [
//!             { "element": "uuid" },
//!             { "sequence": [ { "element": "pattern" }, { "element": "routePartitionName" } ] }
//!         ]
//!     }
//! }))
//! .unwrap();
//!
//! let data = json!({ "pattern": "1000", "routePartitionName": "internal", "description": "lobby" });
//! let identity = resolve_identity(
//!     data.as_object().unwrap(),
//!     schema.choice_groups().unwrap(),
//!     "uuid",
//! );
//!
//! // Only the pattern + partition alternative survives
//! assert_eq!(
//!     serde_json::Value::Object(identity.criteria()),
//!     json!({ "pattern": "1000", "routePartitionName": "internal" })
//! );
//! ```
//!
//! # Wire leaves
//!
//! | Wire form | Sanitized |
//! |-----------|-----------|
//! | `{"_value_1": "X", "uuid": "{..}"}` | `"X"` |
//! | `{"_value_1": null, "uuid": null}` | `null` |
//! | `{"_value_1": "X", "uuid": "{..}", "extra": 1}` | unchanged |
//!
//! # Upsert
//!
//! [`ResourceClient::upsert`] issues one probe fetch, then exactly one update
//! (resource found) or create (probe rejected with a [`RemoteFault`]).
//! Transport failures abort the upsert.

mod client;
mod defaults;
mod document;
mod error;
#[cfg(feature = "remote")]
mod http;
mod identity;
mod loader;
mod sanitize;
mod schema;
mod service;
mod shape;
mod store;
mod types;
mod validator;

pub use client::{Probe, ResourceClient, UpsertAction, UpsertOutcome};
pub use defaults::DefaultsRegistry;
pub use document::{decode, encode, patch, EmbeddedDocument, DEFAULT_DELIMITER};
pub use error::{
    ClientError, DescriptionIssue, DocumentError, DocumentParseError, DocumentStoreError,
    IdentityError, LoadError, RemoteFault, SchemaShapeError, ServiceError, ShapeMismatchError,
    TransportError,
};
pub use identity::{
    check_identifiers, list_criteria, resolve_identity, returned_tags, ResolvedIdentity,
    ReturnedTags,
};
pub use loader::{
    is_url, load_defaults, load_description, load_description_str, load_json, load_json_auto,
    load_json_str, load_record, parse_description,
};
pub use sanitize::{is_wire_leaf, sanitize, sanitized};
pub use schema::{discover_choice_groups, ResourceSchema, SchemaNode};
pub use service::{quote_sql, row_text, Page, RawQuery, RemoteService};
pub use shape::{compare_shapes, filter_to_shape, filter_to_target, remove_fields};
pub use store::{DocumentOwner, DocumentStore, StoredDocument};
pub use types::{
    camel_to_snake, downcase_first, is_truthy, json_type_name, pkid_from_uuid, snake_to_camel,
    upcase_first, ChoiceGroup, Operation, Record, ShapeKind, DEFAULT_PREFERRED_KEY, DISPLAY_KEY,
    REFERENCE_KEY,
};
pub use validator::{description_schema, validate_description};

#[cfg(feature = "remote")]
pub use http::{ConnectionConfig, HttpService};
#[cfg(feature = "remote")]
pub use loader::{load_json_url, HTTP_TIMEOUT};
