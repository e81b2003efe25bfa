//! Remote channel seams.
//!
//! [`RemoteService`] is the typed per-resource RPC channel; [`RawQuery`] is
//! the SQL-style channel used for embedded documents and row lookups. The
//! HTTP implementation lives in `http`; tests substitute in-memory fakes.

use serde_json::Value;

use crate::error::ServiceError;
use crate::types::{Operation, Record};

/// Typed RPC channel: one set of operations per resource type.
///
/// Every method fails with [`ServiceError::Fault`] for business-level
/// rejections and [`ServiceError::Transport`] for everything else.
pub trait RemoteService {
    /// Create a resource; returns its reference.
    fn create(&self, resource: &str, fields: &Record) -> Result<String, ServiceError>;

    /// Fetch one resource by identity.
    fn fetch(
        &self,
        resource: &str,
        identity: &Record,
        returned: Option<&Record>,
    ) -> Result<Record, ServiceError>;

    /// Update a resource; `fields` carries its identifier. Returns its reference.
    fn update(&self, resource: &str, fields: &Record) -> Result<String, ServiceError>;

    /// List resources matching `criteria`.
    fn list(
        &self,
        resource: &str,
        criteria: &Record,
        returned: &Record,
        page: Page,
    ) -> Result<Vec<Record>, ServiceError>;

    /// Remove a resource by identity; returns its reference.
    fn remove(&self, resource: &str, identity: &Record) -> Result<String, ServiceError>;

    /// Run a device action (`apply`, `restart`, `reset`) on the resource
    /// addressed by `identity`; returns its reference.
    fn perform(
        &self,
        action: Operation,
        resource: &str,
        identity: &Record,
    ) -> Result<String, ServiceError>;
}

/// Raw-query channel returning flat rows.
pub trait RawQuery {
    /// Run a query and return its rows.
    fn query(&self, sql: &str) -> Result<Vec<Record>, ServiceError>;

    /// Run a statement and return the number of rows it reports as updated.
    fn execute(&self, sql: &str) -> Result<u64, ServiceError>;
}

/// Paging window for list calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub skip: Option<u64>,
    pub first: Option<u64>,
}

impl Page {
    pub fn new(skip: Option<u64>, first: Option<u64>) -> Self {
        Self { skip, first }
    }
}

/// Quote a value for interpolation into a raw query.
pub fn quote_sql(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Text of a row column, `None` when absent or null.
pub fn row_text<'a>(row: &'a Record, column: &str) -> Option<&'a str> {
    match row.get(column)? {
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

impl<T: RemoteService + ?Sized> RemoteService for &T {
    fn create(&self, resource: &str, fields: &Record) -> Result<String, ServiceError> {
        (**self).create(resource, fields)
    }

    fn fetch(
        &self,
        resource: &str,
        identity: &Record,
        returned: Option<&Record>,
    ) -> Result<Record, ServiceError> {
        (**self).fetch(resource, identity, returned)
    }

    fn update(&self, resource: &str, fields: &Record) -> Result<String, ServiceError> {
        (**self).update(resource, fields)
    }

    fn list(
        &self,
        resource: &str,
        criteria: &Record,
        returned: &Record,
        page: Page,
    ) -> Result<Vec<Record>, ServiceError> {
        (**self).list(resource, criteria, returned, page)
    }

    fn remove(&self, resource: &str, identity: &Record) -> Result<String, ServiceError> {
        (**self).remove(resource, identity)
    }

    fn perform(
        &self,
        action: Operation,
        resource: &str,
        identity: &Record,
    ) -> Result<String, ServiceError> {
        (**self).perform(action, resource, identity)
    }
}

impl<T: RawQuery + ?Sized> RawQuery for &T {
    fn query(&self, sql: &str) -> Result<Vec<Record>, ServiceError> {
        (**self).query(sql)
    }

    fn execute(&self, sql: &str) -> Result<u64, ServiceError> {
        (**self).execute(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quote_doubles_single_quotes() {
        assert_eq!(quote_sql("lobby"), "'lobby'");
        assert_eq!(quote_sql("o'brien"), "'o''brien'");
    }

    #[test]
    fn row_text_reads_strings_only() {
        let row = json!({ "pkid": "abc", "xml": null, "n": 1 });
        let row = row.as_object().unwrap();
        assert_eq!(row_text(row, "pkid"), Some("abc"));
        assert_eq!(row_text(row, "xml"), None);
        assert_eq!(row_text(row, "n"), None);
        assert_eq!(row_text(row, "missing"), None);
    }
}
