//! JSON-over-HTTP implementation of both remote channels.
//!
//! Every call is `POST {endpoint}/{method}` with a JSON body and basic auth.
//! A `200` response carries `{"return": ...}`; a `500` response whose body
//! is `{"fault": {"message": ...}}` is a [`RemoteFault`]. Anything else is a
//! transport error.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{RemoteFault, ServiceError, TransportError};
use crate::loader::HTTP_TIMEOUT;
use crate::service::{Page, RawQuery, RemoteService};
use crate::types::{json_type_name, Operation, Record};

const SQL_QUERY_METHOD: &str = "executeSQLQuery";
const SQL_UPDATE_METHOD: &str = "executeSQLUpdate";

/// Connection settings for [`HttpService`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base URL; method names are appended as path segments.
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout. Defaults to 10 seconds.
    pub timeout: Duration,
    /// Verify the server certificate. Defaults to true.
    pub tls_verify: bool,
}

impl ConnectionConfig {
    /// Create settings for `endpoint` with empty credentials.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: String::new(),
            password: String::new(),
            timeout: HTTP_TIMEOUT,
            tls_verify: true,
        }
    }

    /// Set basic-auth credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set whether the server certificate is verified.
    pub fn tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }
}

#[derive(Deserialize)]
struct FaultEnvelope {
    fault: RemoteFault,
}

/// Blocking HTTP client for the typed and raw-query channels.
pub struct HttpService {
    config: ConnectionConfig,
    client: Client,
}

impl HttpService {
    /// Build a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Client` if the TLS backend cannot be initialized.
    pub fn new(config: ConnectionConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()
            .map_err(|source| TransportError::Client { source })?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Call a remote method and return the content of its `return` member.
    pub fn call(&self, method: &str, body: &Value) -> Result<Value, ServiceError> {
        let url = format!("{}/{}", self.config.endpoint.trim_end_matches('/'), method);
        debug!(%method, "calling remote service");

        let http = |source: reqwest::Error| TransportError::Http {
            method: method.to_string(),
            source,
        };
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(body)
            .send()
            .map_err(http)?;

        let status = response.status();
        if status.is_success() {
            let body: Value = response.json().map_err(http)?;
            return match body {
                Value::Object(mut envelope) => envelope
                    .remove("return")
                    .ok_or_else(|| malformed(method, "missing \"return\" member").into()),
                other => Err(malformed(
                    method,
                    format!("expected object, got {}", json_type_name(&other)),
                )
                .into()),
            };
        }

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let text = response.text().map_err(http)?;
            if let Ok(envelope) = serde_json::from_str::<FaultEnvelope>(&text) {
                debug!(%method, fault = %envelope.fault, "remote fault");
                return Err(envelope.fault.into());
            }
        }

        Err(TransportError::Status {
            method: method.to_string(),
            status: status.as_u16(),
        }
        .into())
    }

    fn call_for_reference(&self, method: &str, body: &Value) -> Result<String, ServiceError> {
        match self.call(method, body)? {
            Value::String(reference) => Ok(reference),
            other => Err(malformed(
                method,
                format!("expected reference string, got {}", json_type_name(&other)),
            )
            .into()),
        }
    }
}

impl RemoteService for HttpService {
    fn create(&self, resource: &str, fields: &Record) -> Result<String, ServiceError> {
        let method = Operation::Create.method_name(resource);
        let mut body = Map::new();
        body.insert(resource.to_string(), Value::Object(fields.clone()));
        self.call_for_reference(&method, &Value::Object(body))
    }

    fn fetch(
        &self,
        resource: &str,
        identity: &Record,
        returned: Option<&Record>,
    ) -> Result<Record, ServiceError> {
        let method = Operation::Fetch.method_name(resource);
        let mut body = identity.clone();
        if let Some(returned) = returned {
            body.insert("returnedTags".to_string(), Value::Object(returned.clone()));
        }

        match unwrap_resource(self.call(&method, &Value::Object(body))?, resource) {
            Value::Object(found) => Ok(found),
            other => Err(malformed(
                &method,
                format!("expected {} object, got {}", resource, json_type_name(&other)),
            )
            .into()),
        }
    }

    fn update(&self, resource: &str, fields: &Record) -> Result<String, ServiceError> {
        let method = Operation::Update.method_name(resource);
        self.call_for_reference(&method, &Value::Object(fields.clone()))
    }

    fn list(
        &self,
        resource: &str,
        criteria: &Record,
        returned: &Record,
        page: Page,
    ) -> Result<Vec<Record>, ServiceError> {
        let method = Operation::List.method_name(resource);
        let mut body = json!({
            "searchCriteria": criteria,
            "returnedTags": returned,
        });
        if let Some(skip) = page.skip {
            body["skip"] = json!(skip);
        }
        if let Some(first) = page.first {
            body["first"] = json!(first);
        }

        let rows = match unwrap_resource(self.call(&method, &body)?, resource) {
            Value::Null => Vec::new(),
            Value::Array(rows) => rows,
            row @ Value::Object(_) => vec![row],
            other => {
                return Err(malformed(
                    &method,
                    format!("expected {} rows, got {}", resource, json_type_name(&other)),
                )
                .into())
            }
        };
        into_records(&method, rows)
    }

    fn remove(&self, resource: &str, identity: &Record) -> Result<String, ServiceError> {
        let method = Operation::Remove.method_name(resource);
        self.call_for_reference(&method, &Value::Object(identity.clone()))
    }

    fn perform(
        &self,
        action: Operation,
        resource: &str,
        identity: &Record,
    ) -> Result<String, ServiceError> {
        let method = action.method_name(resource);
        self.call_for_reference(&method, &Value::Object(identity.clone()))
    }
}

impl RawQuery for HttpService {
    fn query(&self, sql: &str) -> Result<Vec<Record>, ServiceError> {
        debug!(%sql, "raw query");
        let result = self.call(SQL_QUERY_METHOD, &json!({ "sql": sql }))?;
        match result.get("rows") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(rows)) => into_records(SQL_QUERY_METHOD, rows.clone()),
            Some(other) => Err(malformed(
                SQL_QUERY_METHOD,
                format!("expected rows array, got {}", json_type_name(other)),
            )
            .into()),
        }
    }

    fn execute(&self, sql: &str) -> Result<u64, ServiceError> {
        debug!(%sql, "raw update");
        let result = self.call(SQL_UPDATE_METHOD, &json!({ "sql": sql }))?;
        result
            .get("rowsUpdated")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed(SQL_UPDATE_METHOD, "missing \"rowsUpdated\"").into())
    }
}

/// Responses nest the payload under the resource type name when present.
fn unwrap_resource(value: Value, resource: &str) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key(resource) => {
            map.remove(resource).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn into_records(method: &str, rows: Vec<Value>) -> Result<Vec<Record>, ServiceError> {
    rows.into_iter()
        .map(|row| match row {
            Value::Object(record) => Ok(record),
            other => Err(malformed(
                method,
                format!("expected row object, got {}", json_type_name(&other)),
            )
            .into()),
        })
        .collect()
}

fn malformed(method: &str, message: impl Into<String>) -> TransportError {
    TransportError::Malformed {
        method: method.to_string(),
        message: message.into(),
    }
}
