//! Per-resource-type create defaults.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::LoadError;
use crate::types::{json_type_name, Record};

/// Default field values applied when the upsert orchestrator creates a resource.
///
/// Resolved once at startup and passed by reference; caller data always
/// overrides these values.
#[derive(Debug, Clone, Default)]
pub struct DefaultsRegistry {
    entries: HashMap<String, Record>,
}

impl DefaultsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with(mut self, resource: impl Into<String>, defaults: Record) -> Self {
        self.insert(resource, defaults);
        self
    }

    pub fn insert(&mut self, resource: impl Into<String>, defaults: Record) {
        self.entries.insert(resource.into(), defaults);
    }

    /// Defaults registered for a resource type.
    pub fn get(&self, resource: &str) -> Option<&Record> {
        self.entries.get(resource)
    }

    /// Build a registry from `{"resourceType": {field: value, ...}, ...}`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NotAnObject` if the value or any entry is not an object.
    pub fn from_value(value: &Value) -> Result<Self, LoadError> {
        let map = value.as_object().ok_or(LoadError::NotAnObject {
            actual: json_type_name(value),
        })?;

        let mut registry = Self::new();
        for (resource, defaults) in map {
            let defaults = defaults.as_object().ok_or(LoadError::NotAnObject {
                actual: json_type_name(defaults),
            })?;
            registry.insert(resource.clone(), defaults.clone());
        }
        Ok(registry)
    }

    /// Copy of the defaults for `resource` overlaid with `data`.
    ///
    /// Top-level keys of `data` replace default values outright.
    pub fn overlay(&self, resource: &str, data: &Record) -> Record {
        let mut merged = self.get(resource).cloned().unwrap_or_default();
        for (key, value) in data {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> DefaultsRegistry {
        DefaultsRegistry::from_value(&json!({
            "dateTimeGroup": {
                "timeZone": "Europe/London",
                "separator": "-",
                "dateformat": "M-D-Y",
                "timeFormat": "12-hour"
            }
        }))
        .unwrap()
    }

    #[test]
    fn overlay_keeps_unset_defaults() {
        let data = json!({ "name": "ABC" });
        let merged = registry().overlay("dateTimeGroup", data.as_object().unwrap());
        assert_eq!(merged["timeZone"], json!("Europe/London"));
        assert_eq!(merged["name"], json!("ABC"));
    }

    #[test]
    fn overlay_caller_wins() {
        let data = json!({ "name": "ABC", "timeZone": "America/Chicago" });
        let merged = registry().overlay("dateTimeGroup", data.as_object().unwrap());
        assert_eq!(merged["timeZone"], json!("America/Chicago"));
    }

    #[test]
    fn overlay_does_not_mutate_registry() {
        let registry = registry();
        let data = json!({ "timeZone": "UTC" });
        registry.overlay("dateTimeGroup", data.as_object().unwrap());
        assert_eq!(
            registry.get("dateTimeGroup").unwrap()["timeZone"],
            json!("Europe/London")
        );
    }

    #[test]
    fn unknown_resource_has_no_defaults() {
        let data = json!({ "name": "x" });
        let merged = registry().overlay("phone", data.as_object().unwrap());
        assert_eq!(Value::Object(merged), json!({ "name": "x" }));
    }

    #[test]
    fn rejects_non_object_entries() {
        let err = DefaultsRegistry::from_value(&json!({ "phone": [] })).unwrap_err();
        assert!(matches!(err, LoadError::NotAnObject { actual: "array" }));

        let err = DefaultsRegistry::from_value(&json!("x")).unwrap_err();
        assert!(matches!(err, LoadError::NotAnObject { actual: "string" }));
    }
}
