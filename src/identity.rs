//! Identity resolution - picking one legal way to address a resource.
//!
//! The remote service rejects requests that carry more than one identifier,
//! so resolution reduces caller data to exactly one alternative of the
//! resource's choice group. A non-empty surrogate key always wins.

use serde_json::Value;

use crate::error::IdentityError;
use crate::types::{ChoiceGroup, Record};

/// Identifier set produced by [`resolve_identity`].
///
/// Fields of the chosen alternative that the caller did not supply are kept
/// as explicit nulls so callers can see what was considered.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    fields: Record,
    surrogate: bool,
}

impl ResolvedIdentity {
    /// All considered fields, nulls included.
    pub fn fields(&self) -> &Record {
        &self.fields
    }

    /// Whether the identity is the surrogate key alone.
    pub fn is_surrogate(&self) -> bool {
        self.surrogate
    }

    /// Fields with a supplied value, ready to submit as request criteria.
    pub fn criteria(&self) -> Record {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returned-fields record naming every identity field.
    pub fn returned_tags(&self) -> Record {
        returned_tags(self.fields.keys())
    }

    pub fn into_record(self) -> Record {
        self.fields
    }
}

/// Resolve a single identifier set from caller data.
///
/// Every alternative of `choices` contributes its field names (composite
/// alternatives are flattened) with the caller's value or an explicit null.
/// If `preferred_key` ends up non-empty the identity is that key alone.
/// Otherwise the preferred key is dropped and the first alternative with a
/// supplied value is returned; when nothing was supplied the full candidate
/// record is returned so the remote service can report what is missing.
pub fn resolve_identity(
    data: &Record,
    choices: &ChoiceGroup,
    preferred_key: &str,
) -> ResolvedIdentity {
    let mut merged = Record::new();
    let mut candidates: Vec<Record> = Vec::new();

    for alternative in choices.alternatives() {
        let mut candidate = Record::new();
        for name in alternative.field_names() {
            let value = data.get(name).cloned().unwrap_or(Value::Null);
            candidate.insert(name.to_string(), value.clone());
            merged.insert(name.to_string(), value);
        }
        candidates.push(candidate);
    }

    if let Some(value) = merged.get(preferred_key) {
        if is_supplied(value) {
            let mut fields = Record::new();
            fields.insert(preferred_key.to_string(), value.clone());
            return ResolvedIdentity {
                fields,
                surrogate: true,
            };
        }
    }

    let chosen = candidates
        .into_iter()
        .map(|mut candidate| {
            candidate.remove(preferred_key);
            candidate
        })
        .find(|candidate| candidate.values().any(is_supplied));

    let mut fields = chosen.unwrap_or(merged);
    fields.remove(preferred_key);

    ResolvedIdentity {
        fields,
        surrogate: false,
    }
}

/// Check that `data` fully supplies at least one alternative of `choices`.
///
/// # Errors
///
/// Returns `IdentityError::NoIdentifier` listing the alternatives otherwise.
pub fn check_identifiers(choices: &ChoiceGroup, data: &Record) -> Result<(), IdentityError> {
    let satisfied = choices.alternatives().iter().any(|alternative| {
        alternative
            .field_names()
            .iter()
            .all(|name| data.get(*name).map(is_supplied).unwrap_or(false))
    });

    if satisfied {
        Ok(())
    } else {
        Err(IdentityError::NoIdentifier {
            alternatives: choices
                .alternatives()
                .iter()
                .map(|alternative| alternative.field_names().join("+"))
                .collect(),
        })
    }
}

/// Build a null-string returned-fields record: `{"name": "", "uuid": ""}`.
pub fn returned_tags<I, S>(fields: I) -> Record
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| (f.as_ref().to_string(), Value::String(String::new())))
        .collect()
}

/// Which fields a fetch or list call should return.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReturnedTags {
    /// Everything the response model carries.
    #[default]
    All,
    Fields(Vec<String>),
    Record(Record),
}

impl ReturnedTags {
    /// Render as a returned-fields record; `All` falls back to `model`.
    pub fn to_record(&self, model: Option<&Record>) -> Option<Record> {
        match self {
            ReturnedTags::All => model.cloned(),
            ReturnedTags::Fields(fields) => Some(returned_tags(fields)),
            ReturnedTags::Record(record) => Some(record.clone()),
        }
    }
}

/// Keep only supported list criteria.
///
/// When nothing supported remains, searches the first supported criterion
/// with the `%` wildcard. Returns `None` if no criteria are supported at all.
pub fn list_criteria(criteria: Option<&Record>, supported: &[String]) -> Option<Record> {
    let mut kept: Record = criteria
        .map(|c| {
            c.iter()
                .filter(|(k, _)| supported.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    if kept.is_empty() {
        let first = supported.first()?;
        kept.insert(first.clone(), Value::String("%".to_string()));
    }
    Some(kept)
}

fn is_supplied(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_PREFERRED_KEY;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn uuid_or_name_partition() -> ChoiceGroup {
        ChoiceGroup::OneOf(vec![
            ChoiceGroup::AllOf(vec![ChoiceGroup::Field("uuid".into())]),
            ChoiceGroup::AllOf(vec![
                ChoiceGroup::Field("name".into()),
                ChoiceGroup::Field("partition".into()),
            ]),
        ])
    }

    #[test]
    fn surrogate_key_wins() {
        let data = record(json!({ "name": "X", "uuid": "u1" }));
        let identity = resolve_identity(&data, &uuid_or_name_partition(), DEFAULT_PREFERRED_KEY);
        assert_eq!(Value::Object(identity.fields().clone()), json!({ "uuid": "u1" }));
        assert!(identity.is_surrogate());
    }

    #[test]
    fn empty_surrogate_falls_back() {
        let data = record(json!({ "name": "ABC", "uuid": null }));
        let identity = resolve_identity(&data, &uuid_or_name_partition(), DEFAULT_PREFERRED_KEY);
        assert_eq!(
            Value::Object(identity.fields().clone()),
            json!({ "name": "ABC", "partition": null })
        );
        assert!(!identity.is_surrogate());
        assert_eq!(Value::Object(identity.criteria()), json!({ "name": "ABC" }));
    }

    #[test]
    fn empty_string_surrogate_is_not_supplied() {
        let data = record(json!({ "name": "ABC", "uuid": "" }));
        let identity = resolve_identity(&data, &uuid_or_name_partition(), DEFAULT_PREFERRED_KEY);
        assert!(identity.fields().get("uuid").is_none());
        assert_eq!(identity.fields()["name"], json!("ABC"));
    }

    #[test]
    fn first_supplied_alternative_only() {
        let choices = ChoiceGroup::OneOf(vec![
            ChoiceGroup::Field("uuid".into()),
            ChoiceGroup::Field("name".into()),
            ChoiceGroup::Field("dirn".into()),
        ]);
        let data = record(json!({ "dirn": "1000", "name": "SEP001122334455" }));
        let identity = resolve_identity(&data, &choices, DEFAULT_PREFERRED_KEY);
        assert_eq!(
            Value::Object(identity.into_record()),
            json!({ "name": "SEP001122334455" })
        );
    }

    #[test]
    fn nothing_supplied_keeps_all_candidates() {
        let data = record(json!({ "description": "lobby" }));
        let identity = resolve_identity(&data, &uuid_or_name_partition(), DEFAULT_PREFERRED_KEY);
        assert_eq!(
            Value::Object(identity.fields().clone()),
            json!({ "name": null, "partition": null })
        );
        assert!(identity.criteria().is_empty());
    }

    #[test]
    fn returned_tags_from_identity() {
        let data = record(json!({ "name": "ABC" }));
        let identity = resolve_identity(&data, &uuid_or_name_partition(), DEFAULT_PREFERRED_KEY);
        assert_eq!(
            Value::Object(identity.returned_tags()),
            json!({ "name": "", "partition": "" })
        );
    }

    #[test]
    fn surrogate_inside_composite_keeps_other_fields() {
        let choices = ChoiceGroup::AllOf(vec![
            ChoiceGroup::OneOf(vec![
                ChoiceGroup::Field("uuid".into()),
                ChoiceGroup::Field("name".into()),
            ]),
            ChoiceGroup::Field("partition".into()),
        ]);
        let data = record(json!({ "name": "ABC", "partition": "P" }));
        let identity = resolve_identity(&data, &choices, DEFAULT_PREFERRED_KEY);
        assert_eq!(
            Value::Object(identity.into_record()),
            json!({ "name": "ABC", "partition": "P" })
        );
    }

    #[test]
    fn custom_preferred_key() {
        let choices = ChoiceGroup::OneOf(vec![
            ChoiceGroup::Field("userid".into()),
            ChoiceGroup::Field("uuid".into()),
        ]);
        let data = record(json!({ "userid": "jdoe", "uuid": "u9" }));
        let identity = resolve_identity(&data, &choices, "userid");
        assert_eq!(Value::Object(identity.into_record()), json!({ "userid": "jdoe" }));
    }

    #[test]
    fn check_identifiers_requires_full_alternative() {
        let choices = uuid_or_name_partition();
        assert!(check_identifiers(&choices, &record(json!({ "uuid": "u1" }))).is_ok());
        assert!(check_identifiers(
            &choices,
            &record(json!({ "name": "a", "partition": "p" }))
        )
        .is_ok());

        let err = check_identifiers(&choices, &record(json!({ "name": "a" }))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no identifier supplied; expected one of: uuid | name+partition"
        );
    }

    #[test]
    fn returned_tags_variants() {
        let model = record(json!({ "name": "", "description": "" }));
        assert_eq!(ReturnedTags::All.to_record(Some(&model)), Some(model.clone()));
        assert_eq!(
            ReturnedTags::Fields(vec!["name".into()]).to_record(Some(&model)),
            Some(record(json!({ "name": "" })))
        );
        assert_eq!(ReturnedTags::All.to_record(None), None);
    }

    #[test]
    fn list_criteria_filters_and_defaults() {
        let supported = vec!["name".to_string(), "description".to_string()];
        let criteria = record(json!({ "name": "SEP%", "bogus": "x" }));
        assert_eq!(
            list_criteria(Some(&criteria), &supported),
            Some(record(json!({ "name": "SEP%" })))
        );
        assert_eq!(
            list_criteria(None, &supported),
            Some(record(json!({ "name": "%" })))
        );
        assert_eq!(list_criteria(None, &[]), None);
    }
}
