//! Draft Validation
//!
//! Required-field checks run before any record leaves the dialog.

use super::record::Record;
use super::registry::ResourceSchema;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field key -> message. A non-empty map blocks submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorMap(BTreeMap<String, String>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, message: String) {
        self.0.insert(key.to_string(), message);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Check every required field of `schema` against `draft`
pub fn validate(draft: &Record, schema: &ResourceSchema) -> ErrorMap {
    let mut errors = ErrorMap::new();
    for field in schema.fields.iter().filter(|f| f.required) {
        if is_blank(draft.get(&field.key)) {
            errors.insert(&field.key, format!("{} is required.", field.label));
        }
    }
    errors
}

/// Absent, null, whitespace-only text, or an empty list/object
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Number(_)) | Some(Value::Bool(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::{FieldDef, FieldKind};
    use serde_json::json;

    fn schema() -> ResourceSchema {
        ResourceSchema::new("clinics", "Clinic", "clinics")
            .with_field(FieldDef::required("name"))
            .with_field(FieldDef::required("address"))
    }

    #[test]
    fn test_missing_name_reported_with_label() {
        let draft = Record::new()
            .with_field("name", "")
            .with_field("address", "X");
        let errors = validate(&draft, &schema());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("name"), Some("Name is required."));
    }

    #[test]
    fn test_whitespace_does_not_satisfy_required() {
        let draft = Record::new()
            .with_field("name", "   ")
            .with_field("address", "\t");
        let errors = validate(&draft, &schema());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("address"), Some("Address is required."));
    }

    #[test]
    fn test_empty_list_is_blank() {
        let schema = ResourceSchema::new("hospitals", "Hospital", "hospitals").with_field(
            FieldDef::required("availableSpecialties")
                .with_label("Available specialties")
                .with_kind(FieldKind::List),
        );
        let draft = Record::new().with_field("availableSpecialties", json!([]));
        assert_eq!(
            validate(&draft, &schema).get("availableSpecialties"),
            Some("Available specialties is required.")
        );

        let draft = Record::new().with_field("availableSpecialties", json!(["ER"]));
        assert!(validate(&draft, &schema).is_empty());
    }

    #[test]
    fn test_optional_fields_are_ignored() {
        let schema = schema().with_field(FieldDef::new("notes"));
        let draft = Record::new()
            .with_field("name", "Acme")
            .with_field("address", "1 Main St");
        assert!(validate(&draft, &schema).is_empty());
    }

    #[test]
    fn test_numbers_and_zero_are_present() {
        assert!(!is_blank(Some(&json!(0))));
        assert!(!is_blank(Some(&json!(false))));
        assert!(is_blank(Some(&json!({}))));
        assert!(is_blank(Some(&Value::Null)));
    }

    #[test]
    fn test_validate_does_not_touch_draft() {
        let draft = Record::new().with_field("name", " ");
        let before = draft.clone();
        let first = validate(&draft, &schema());
        let second = validate(&draft, &schema());
        assert_eq!(draft, before);
        assert_eq!(first, second);
    }
}
