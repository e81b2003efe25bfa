//! Loading descriptions, defaults and data records.
//!
//! Handles loading from files, strings, and HTTP URLs.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::defaults::DefaultsRegistry;
use crate::error::LoadError;
use crate::schema::ResourceSchema;
use crate::types::{json_type_name, Record};
use crate::validator::validate_description;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON value from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_json_str(&content)
}

/// Load a JSON value from a string.
pub fn load_json_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a JSON value from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the response
/// isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_json_url(url: &str) -> Result<Value, LoadError> {
    let network = |source: reqwest::Error| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(network)?
        .json()
        .map_err(network)
}

/// Load a JSON value from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub fn load_json_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_json_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_json(Path::new(source))
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Validate and introspect a description value.
///
/// # Errors
///
/// Returns `LoadError::InvalidDescription` listing structural issues, or
/// `LoadError::Schema` if introspection rejects the identifier tree.
pub fn parse_description(description: &Value) -> Result<ResourceSchema, LoadError> {
    validate_description(description)?;
    let schema = ResourceSchema::from_value(description)?;
    debug!(resource = schema.resource(), "loaded resource description");
    Ok(schema)
}

/// Load a resource description from a file path or URL.
pub fn load_description(source: &str) -> Result<ResourceSchema, LoadError> {
    parse_description(&load_json_auto(source)?)
}

/// Load a resource description from a JSON string.
pub fn load_description_str(content: &str) -> Result<ResourceSchema, LoadError> {
    parse_description(&load_json_str(content)?)
}

/// Load a defaults registry file: `{"resourceType": {field: value}}`.
pub fn load_defaults(path: &Path) -> Result<DefaultsRegistry, LoadError> {
    DefaultsRegistry::from_value(&load_json(path)?)
}

/// Load a data record: a JSON object from a file, or from stdin when `path` is `-`.
pub fn load_record(path: &Path) -> Result<Record, LoadError> {
    let value = if path == Path::new("-") {
        let content = std::io::read_to_string(std::io::stdin()).map_err(|source| {
            LoadError::ReadError {
                path: path.to_path_buf(),
                source,
            }
        })?;
        load_json_str(&content)?
    } else {
        load_json(path)?
    };

    match value {
        Value::Object(record) => Ok(record),
        other => Err(LoadError::NotAnObject {
            actual: json_type_name(&other),
        }),
    }
}
