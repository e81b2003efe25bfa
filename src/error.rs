//! Error types for schema introspection, payload shaping and remote calls.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Operation;

/// Introspection met a schema node it does not understand.
///
/// Always fatal: it means the description and this crate disagree on the
/// remote schema's layout.
#[derive(Debug, Error)]
pub enum SchemaShapeError {
    #[error("unrecognized schema node at {path}: expected element, sequence or choice, got {found}")]
    UnrecognizedNode { path: String, found: String },

    #[error("element at {path} has no field name")]
    EmptyFieldName { path: String },

    #[error("{kind} at {path} has no members")]
    EmptyComposite { path: String, kind: &'static str },

    #[error("invalid schema description: {message}")]
    InvalidDescription { message: String },
}

/// A value's runtime shape cannot be reconciled with the target shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("shape mismatch at {path}: expected {expected}, got {actual}")]
pub struct ShapeMismatchError {
    pub path: String,
    pub expected: &'static str,
    pub actual: &'static str,
}

/// Supplied data does not identify a resource.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no identifier supplied; expected one of: {}", alternatives.join(" | "))]
    NoIdentifier { alternatives: Vec<String> },
}

/// Business-level rejection returned by the remote service.
///
/// Covers "not found" and validation failures alike; the service does not
/// distinguish them by type.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct RemoteFault {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl RemoteFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }
}

/// Connectivity, authentication or protocol failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[cfg(feature = "remote")]
    #[error("failed to build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to call {method}: {source}")]
    Http {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} returned HTTP {status}")]
    Status { method: String, status: u16 },

    #[error("malformed response from {method}: {message}")]
    Malformed { method: String, message: String },
}

/// Failure of a call on either remote channel.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("remote fault: {0}")]
    Fault(#[from] RemoteFault),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ServiceError {
    /// The remote fault, if this is a business-level rejection.
    pub fn fault(&self) -> Option<&RemoteFault> {
        match self {
            ServiceError::Fault(fault) => Some(fault),
            ServiceError::Transport(_) => None,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceError::Fault(_) => 1,
            ServiceError::Transport(_) => 3,
        }
    }
}

/// Malformed embedded-document fragment.
#[derive(Debug, Error)]
pub enum DocumentParseError {
    #[error("malformed document fragment: {source}")]
    Xml {
        #[source]
        source: quick_xml::Error,
    },

    #[error("malformed document fragment: closing tag </{found}> does not match <{expected}>")]
    MismatchedTag { expected: String, found: String },

    #[error("malformed document fragment: unexpected closing tag </{found}>")]
    UnexpectedClose { found: String },

    #[error("malformed document fragment: unclosed tag <{name}>")]
    Unclosed { name: String },

    #[error("malformed document fragment: tag name is not UTF-8")]
    InvalidName,
}

/// Errors while decoding, encoding or patching an embedded document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Parse(#[from] DocumentParseError),

    #[error("invalid tag name \"{name}\"")]
    InvalidTagName { name: String },

    #[error("cannot encode {actual} at {path}")]
    UnsupportedValue { path: String, actual: &'static str },

    #[error("invalid document path \"{path}\"")]
    InvalidPath { path: String },

    #[error("cannot descend into scalar \"{segment}\" while patching {path}")]
    PathConflict { path: String, segment: String },

    #[error("failed to write document: {source}")]
    Write {
        #[source]
        source: quick_xml::Error,
    },
}

impl DocumentError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors from typed resource calls and the upsert orchestrator.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Schema(#[from] SchemaShapeError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Shape(#[from] ShapeMismatchError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{resource} does not support '{operation}'")]
    Unsupported {
        resource: String,
        operation: Operation,
    },
}

impl ClientError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Service(e) => e.exit_code(),
            _ => 2,
        }
    }
}

/// Errors reading or writing an embedded document through the raw-query channel.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("no document row found for {owner}")]
    NotFound { owner: String },

    #[error("{rows} document rows found for {owner}, expected one")]
    Ambiguous { owner: String, rows: usize },
}

impl DocumentStoreError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DocumentStoreError::Service(e) => e.exit_code(),
            DocumentStoreError::NotFound { .. } => 1,
            _ => 2,
        }
    }
}

/// Errors while loading descriptions, registries and data files.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON object, got {actual}")]
    NotAnObject { actual: &'static str },

    #[error("invalid schema description: {} issue(s)", issues.len())]
    InvalidDescription { issues: Vec<DescriptionIssue> },

    #[error(transparent)]
    Schema(#[from] SchemaShapeError),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Single description validation issue with path context.
#[derive(Debug, Clone, Serialize)]
pub struct DescriptionIssue {
    /// JSON Pointer (RFC 6901) to the offending value.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for DescriptionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("phone.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::NotAnObject { actual: "array" };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn service_error_exit_codes() {
        let err = ServiceError::from(RemoteFault::new("Item not valid"));
        assert_eq!(err.exit_code(), 1);
        assert!(err.fault().is_some());

        let err = ServiceError::from(TransportError::Status {
            method: "getPhone".into(),
            status: 401,
        });
        assert_eq!(err.exit_code(), 3);
        assert!(err.fault().is_none());
    }

    #[test]
    fn client_error_exit_code_follows_service() {
        let err = ClientError::from(ServiceError::from(TransportError::Status {
            method: "addPhone".into(),
            status: 503,
        }));
        assert_eq!(err.exit_code(), 3);

        let err = ClientError::Unsupported {
            resource: "phone".into(),
            operation: Operation::Update,
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "phone does not support 'update'");
    }

    #[test]
    fn fault_display_is_message() {
        let fault = RemoteFault::new("Item not valid: The specified Phone was not found");
        assert_eq!(
            fault.to_string(),
            "Item not valid: The specified Phone was not found"
        );
    }

    #[test]
    fn description_issue_display() {
        let issue = DescriptionIssue {
            path: "/resource".into(),
            message: "\"resource\" is a required property".into(),
        };
        assert_eq!(
            issue.to_string(),
            "/resource: \"resource\" is a required property"
        );
    }
}
