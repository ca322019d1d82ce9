//! Resource Registry - Load resource schemas from JSON
//!
//! This module loads every resource schema from embedded JSON files and
//! provides lookup functions for the rest of the application. A schema is
//! all a resource type needs to get a full list/create/edit/delete screen.

use super::record::Record;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/directory.json"),
    include_str!("../resources/pharmacy.json"),
    include_str!("../resources/intake.json"),
];

const DEFAULT_COLUMN_WIDTH: u16 = 16;

fn default_width() -> u16 {
    DEFAULT_COLUMN_WIDTH
}

/// How a field's value is entered and sent to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    /// Comma separated input, sent as a JSON array of strings
    List,
    /// One of `options`, or of the list served at `options_endpoint`
    Choice,
    /// Id of a record of the resource named by `reference`
    Reference,
}

impl FieldKind {
    /// Picked from a list rather than typed
    pub fn is_selectable(self) -> bool {
        matches!(self, FieldKind::Choice | FieldKind::Reference)
    }
}

/// Field descriptor from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub key: String,
    /// Derived from `key` when omitted
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub options: Vec<String>,
    /// Path below the resource's own endpoint serving the option list,
    /// e.g. `enums` for `medical-insurances/enums`. Static `options` are
    /// the fallback while it is unavailable.
    #[serde(default)]
    pub options_endpoint: Option<String>,
    /// Registry key of the referenced resource
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default = "default_width")]
    pub width: u16,
}

impl FieldDef {
    /// Optional text field labelled after its key
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            label: humanize(key),
            required: false,
            kind: FieldKind::Text,
            options: Vec::new(),
            options_endpoint: None,
            reference: None,
            width: DEFAULT_COLUMN_WIDTH,
        }
    }

    /// Required text field labelled after its key
    pub fn required(key: &str) -> Self {
        Self {
            required: true,
            ..Self::new(key)
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.kind = FieldKind::Choice;
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn with_options_endpoint(mut self, path: &str) -> Self {
        self.kind = FieldKind::Choice;
        self.options_endpoint = Some(path.to_string());
        self
    }

    pub fn with_reference(mut self, resource_key: &str) -> Self {
        self.kind = FieldKind::Reference;
        self.reference = Some(resource_key.to_string());
        self
    }

    /// Value a fresh draft starts with
    pub fn empty_value(&self) -> Value {
        match self.kind {
            FieldKind::Text | FieldKind::Choice => Value::String(String::new()),
            FieldKind::Number | FieldKind::Reference => Value::Null,
            FieldKind::List => Value::Array(Vec::new()),
        }
    }

    /// Convert raw form input into the JSON value sent to the backend.
    ///
    /// Numbers that do not parse are kept as text so the user's input is
    /// never silently lost; the backend gets to reject them.
    pub fn parse_input(&self, input: &str) -> Value {
        match self.kind {
            FieldKind::Text | FieldKind::Choice => Value::String(input.to_string()),
            FieldKind::Number => {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    return Value::Null;
                }
                if let Ok(n) = trimmed.parse::<i64>() {
                    return Value::from(n);
                }
                match trimmed.parse::<f64>() {
                    Ok(f) => serde_json::Number::from_f64(f)
                        .map(Value::Number)
                        .unwrap_or_else(|| Value::String(input.to_string())),
                    Err(_) => Value::String(input.to_string()),
                }
            },
            FieldKind::List => Value::Array(
                input
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
            // Typed ids go out in the shape the backend uses for them
            FieldKind::Reference => {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    Value::Null
                } else if let Ok(n) = trimmed.parse::<i64>() {
                    Value::from(n)
                } else {
                    Value::String(trimmed.to_string())
                }
            },
        }
    }
}

/// One selectable value of a choice or reference field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChoice {
    /// What is stored in the draft and sent to the backend
    pub value: Value,
    /// What the form and table show
    pub label: String,
}

impl FieldChoice {
    /// Option as served by an options endpoint: plain strings label
    /// themselves, objects are labelled by their name.
    pub fn from_value(value: Value) -> Self {
        Self {
            label: format_value(Some(&value)),
            value,
        }
    }
}

/// Render any JSON value as a single line of text
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| format_value(Some(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Object(map)) => map
            .get("name")
            .or_else(|| map.get("id"))
            .map(|v| format_value(Some(v)))
            .unwrap_or_else(|| "{..}".to_string()),
    }
}

/// Per-resource-type descriptor
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSchema {
    /// Registry key, e.g. `clinics`
    #[serde(skip)]
    pub key: String,
    pub display_name: String,
    /// Used in feedback messages, e.g. "Clinic created."
    pub singular: String,
    /// Path below the backend base URL
    pub endpoint: String,
    /// Field that names a record in prompts, filters and references.
    /// Defaults to `name`.
    #[serde(default)]
    pub label_field: Option<String>,
    pub fields: Vec<FieldDef>,
}

impl ResourceSchema {
    pub fn new(key: &str, singular: &str, endpoint: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: humanize(key),
            singular: singular.to_string(),
            endpoint: endpoint.to_string(),
            label_field: None,
            fields: Vec::new(),
        }
    }

    pub fn with_label_field(mut self, key: &str) -> Self {
        self.label_field = Some(key.to_string());
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Short human label for a record: its label field, else its first
    /// field, else its id
    pub fn record_label(&self, record: &Record) -> String {
        let named = format_value(record.get(self.label_field.as_deref().unwrap_or("name")));
        if !named.is_empty() {
            return named;
        }
        self.fields
            .first()
            .map(|f| format_value(record.get(&f.key)))
            .filter(|s| !s.is_empty())
            .or_else(|| record.id.as_ref().map(ToString::to_string))
            .unwrap_or_else(|| "-".to_string())
    }

    /// Resources this schema's reference fields point at
    pub fn referenced_resources(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Reference)
            .filter_map(|f| f.reference.as_deref())
            .filter(move |key| *key != self.key)
    }

    fn normalize(&mut self, key: &str) {
        self.key = key.to_string();
        for field in &mut self.fields {
            if field.label.is_empty() {
                field.label = humanize(&field.key);
            }
        }
    }
}

/// Turn `phoneNumber` or `medical-insurances` into `Phone number` / `Medical insurances`
pub fn humanize(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c == '-' || c == '_' {
            out.push(' ');
        } else if c.is_uppercase() && i > 0 {
            out.push(' ');
            out.extend(c.to_lowercase());
        } else if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceSchema>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        for (key, schema) in final_config.resources.iter_mut() {
            schema.normalize(key);
        }

        final_config
    })
}

/// Get a resource schema by key
pub fn get_resource(key: &str) -> Option<&'static ResourceSchema> {
    get_registry().resources.get(key)
}

/// Owned handle to a registered schema, for handing to a controller
pub fn schema_handle(key: &str) -> Option<Arc<ResourceSchema>> {
    get_resource(key).map(|schema| Arc::new(schema.clone()))
}

/// Get all resource keys, sorted (for autocomplete)
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.resources.is_empty(),
            "Registry should have resources"
        );
    }

    #[test]
    fn test_clinics_resource_exists() {
        let resource = get_resource("clinics").expect("clinics should be registered");
        assert_eq!(resource.key, "clinics");
        assert_eq!(resource.singular, "Clinic");
        assert_eq!(resource.endpoint, "clinics");
        assert_eq!(resource.fields.len(), 6);
        assert!(resource.fields.iter().all(|f| f.required));
        assert_eq!(
            resource.field("specialization").map(|f| f.kind),
            Some(FieldKind::List)
        );
    }

    #[test]
    fn test_every_healthcare_resource_is_registered() {
        let keys = get_all_resource_keys();
        for key in [
            "clinics",
            "hospitals",
            "pharmacies",
            "medications",
            "orders",
            "medical-insurances",
            "reservations",
        ] {
            assert!(keys.contains(&key), "missing resource {}", key);
        }
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_selectable_fields_have_a_source() {
        for key in get_all_resource_keys() {
            let schema = get_resource(key).unwrap();
            for field in &schema.fields {
                assert!(!field.label.is_empty());
                match field.kind {
                    FieldKind::Choice => assert!(
                        !field.options.is_empty() || field.options_endpoint.is_some(),
                        "{}.{}",
                        key,
                        field.key
                    ),
                    FieldKind::Reference => {
                        let target = field.reference.as_deref().unwrap_or_default();
                        assert!(get_resource(target).is_some(), "{}.{}", key, field.key);
                    },
                    _ => {},
                }
            }
        }
    }

    #[test]
    fn test_server_backed_fields() {
        let insurances = get_resource("medical-insurances").unwrap();
        let provider = insurances.field("insuranceProvider").unwrap();
        assert_eq!(provider.options_endpoint.as_deref(), Some("enums"));
        assert!(!provider.options.is_empty());

        let reservations = get_resource("reservations").unwrap();
        assert_eq!(
            reservations.field("clinic").and_then(|f| f.options_endpoint.as_deref()),
            Some("clinics")
        );

        let orders = get_resource("orders").unwrap();
        assert_eq!(
            orders.referenced_resources().collect::<Vec<_>>(),
            vec!["medications", "pharmacies"]
        );
    }

    #[test]
    fn test_record_label_fallbacks() {
        let clinics = get_resource("clinics").unwrap();
        let named = Record::new().with_id(3).with_field("name", "North");
        assert_eq!(clinics.record_label(&named), "North");
        let bare = Record::new().with_id(3);
        assert_eq!(clinics.record_label(&bare), "3");

        let hospitals = get_resource("hospitals").unwrap();
        let hospital = Record::new()
            .with_id(1)
            .with_field("hospitalNumber", "H-7")
            .with_field("hospitalName", "St. Mary");
        assert_eq!(hospitals.record_label(&hospital), "St. Mary");
    }

    #[test]
    fn test_reference_input_keeps_id_shape() {
        let field = FieldDef::required("medication").with_reference("medications");
        assert_eq!(field.empty_value(), Value::Null);
        assert_eq!(field.parse_input(" 12 "), json!(12));
        assert_eq!(field.parse_input("a-7"), json!("a-7"));
        assert_eq!(field.parse_input(""), Value::Null);
        assert!(field.kind.is_selectable());
        assert!(!FieldKind::Number.is_selectable());
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("name"), "Name");
        assert_eq!(humanize("phoneNumber"), "Phone number");
        assert_eq!(humanize("medical-insurances"), "Medical insurances");
    }

    #[test]
    fn test_parse_input_by_kind() {
        let text = FieldDef::new("name");
        assert_eq!(text.parse_input(" Acme "), json!(" Acme "));

        let number = FieldDef::new("price").with_kind(FieldKind::Number);
        assert_eq!(number.parse_input("12"), json!(12));
        assert_eq!(number.parse_input("2.5"), json!(2.5));
        assert_eq!(number.parse_input("  "), Value::Null);
        assert_eq!(number.parse_input("abc"), json!("abc"));

        let list = FieldDef::new("specialization").with_kind(FieldKind::List);
        assert_eq!(
            list.parse_input("Cardiology, , Pediatrics"),
            json!(["Cardiology", "Pediatrics"])
        );
        assert_eq!(list.parse_input(" "), json!([]));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(None), "");
        assert_eq!(format_value(Some(&json!(["a", "b"]))), "a, b");
        assert_eq!(format_value(Some(&json!({"id": 3, "name": "Main"}))), "Main");
        assert_eq!(format_value(Some(&json!(4.5))), "4.5");
    }

    #[test]
    fn test_choice_from_served_value() {
        let plain = FieldChoice::from_value(json!("AXA"));
        assert_eq!(plain.label, "AXA");
        let clinic = FieldChoice::from_value(json!({"id": 2, "name": "East", "schedule": ["Mon"]}));
        assert_eq!(clinic.label, "East");
        assert_eq!(clinic.value["id"], json!(2));
    }
}
