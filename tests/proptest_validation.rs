//! Property-based tests using proptest
//!
//! These tests verify required-field validation, form input parsing and
//! the record set bookkeeping using randomized inputs.

use caredesk::notification::{FeedbackEvent, Notifier};
use caredesk::resource::{
    get_resource, schema_handle, validate, FieldDef, FieldKind, Record, RecordId,
    ResourceController,
};
use caredesk::transport::MemoryTransport;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A field value that is either blank in one of the accepted ways or filled
fn arb_field_value() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(Value::Null)),
        "[ \t]{0,4}".prop_map(|s| Some(Value::String(s))),
        Just(Some(json!([]))),
        "[A-Za-z0-9][A-Za-z0-9 ]{0,20}".prop_map(|s| Some(Value::String(s))),
        any::<i32>().prop_map(|n| Some(json!(n))),
        prop::collection::vec("[a-z]{1,8}", 1..4).prop_map(|v| Some(json!(v))),
    ]
}

fn is_blank(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

fn build_draft(keys: &[String], values: &[Option<Value>]) -> Record {
    let mut draft = Record::new();
    for (key, value) in keys.iter().zip(values) {
        if let Some(value) = value {
            draft.set(key, value.clone());
        }
    }
    draft
}

struct Silent;

impl Notifier for Silent {
    fn notify(&self, _event: FeedbackEvent) {}
}

#[derive(Debug, Clone)]
enum Action {
    Create(String),
    Remove(usize),
}

fn arb_actions() -> impl Strategy<Value = Vec<Action>> {
    prop::collection::vec(
        prop_oneof![
            "[A-Z][a-z]{2,10}".prop_map(Action::Create),
            (0usize..8).prop_map(Action::Remove),
        ],
        0..30,
    )
}

proptest! {
    /// Errors name exactly the required fields that are blank
    #[test]
    fn test_errors_match_blank_required_fields(
        values in prop::collection::vec(arb_field_value(), 4)
    ) {
        let schema = get_resource("orders").unwrap();
        let keys: Vec<String> = schema.fields.iter().map(|f| f.key.clone()).collect();
        let draft = build_draft(&keys, &values);

        let errors = validate(&draft, schema);

        let expected: BTreeSet<&str> = schema
            .fields
            .iter()
            .zip(&values)
            .filter(|(field, value)| field.required && is_blank(value))
            .map(|(field, _)| field.key.as_str())
            .collect();
        let actual: BTreeSet<&str> = errors.iter().map(|(key, _)| key).collect();

        prop_assert_eq!(actual, expected);
    }

    /// A draft with every required field filled is always accepted
    #[test]
    fn test_filled_drafts_are_valid(
        name in "[A-Za-z][A-Za-z ]{0,30}",
        specialties in prop::collection::vec("[A-Za-z]{1,12}", 1..5),
        number in 1u32..10_000,
    ) {
        let schema = get_resource("clinics").unwrap();
        let draft = Record::new()
            .with_field("clinicNumber", number.to_string())
            .with_field("name", name.clone())
            .with_field("address", format!("{} Main St", number))
            .with_field("specialization", json!(specialties))
            .with_field("schedule", "Mon-Fri")
            .with_field("phoneNumber", "555-0100");

        prop_assert!(validate(&draft, schema).is_empty());
    }

    /// Optional fields never show up in the error map
    #[test]
    fn test_optional_fields_never_reported(value in arb_field_value()) {
        let schema = get_resource("orders").unwrap();
        let mut draft = Record::new()
            .with_field("medication", "Aspirin")
            .with_field("quantity", 2)
            .with_field("pharmacy", "Corner");
        if let Some(value) = value {
            draft.set("price", value);
        }

        prop_assert!(validate(&draft, schema).get("price").is_none());
    }

    /// Comma separated input yields the trimmed, non-empty items in order
    #[test]
    fn test_list_input_parsing(items in prop::collection::vec("[A-Za-z][A-Za-z ]{0,10}[A-Za-z]", 0..6)) {
        let field = FieldDef::new("specialization").with_kind(FieldKind::List);
        let input = items.iter().map(|s| format!(" {} ", s)).collect::<Vec<_>>().join(",,");

        let expected: Vec<Value> = items.iter().map(|s| json!(s)).collect();
        prop_assert_eq!(field.parse_input(&input), Value::Array(expected));
    }

    /// Integer input becomes a JSON integer regardless of padding
    #[test]
    fn test_number_input_parsing(n in any::<i64>(), pad in 0usize..3) {
        let field = FieldDef::new("quantity").with_kind(FieldKind::Number);
        let input = format!("{}{}{}", " ".repeat(pad), n, " ".repeat(pad));
        prop_assert_eq!(field.parse_input(&input), json!(n));
    }

    /// Text that is not a number is kept verbatim
    #[test]
    fn test_non_numeric_input_kept_as_text(s in "[a-z]{1,10}") {
        prop_assume!(s.parse::<f64>().is_err());
        let field = FieldDef::new("price").with_kind(FieldKind::Number);
        prop_assert_eq!(field.parse_input(&s), Value::String(s.clone()));
    }

    /// The record set follows a simple model through creates and deletes
    #[test]
    fn test_record_set_tracks_model(actions in arb_actions()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            let controller = ResourceController::new(
                schema_handle("medications").unwrap(),
                Arc::new(MemoryTransport::new("medications")),
                Arc::new(Silent),
            );
            let mut model: Vec<(RecordId, String)> = Vec::new();

            for action in &actions {
                match action {
                    Action::Create(name) => {
                        controller.on_create_requested();
                        controller.on_field_changed("name", json!(name)).unwrap();
                        controller.on_field_changed("price", json!(1)).unwrap();
                        let event = controller.on_save_requested().await;
                        prop_assert!(!event.is_error());

                        let created = controller.records().last().cloned().unwrap();
                        model.push((created.id.unwrap(), name.clone()));
                    },
                    Action::Remove(idx) => {
                        if model.is_empty() {
                            continue;
                        }
                        let (id, _) = model.remove(idx % model.len());
                        let event = controller.on_delete_requested(&id).await;
                        prop_assert!(!event.is_error());
                    },
                }

                let records = controller.records();
                prop_assert_eq!(records.len(), model.len());
                for (record, (id, name)) in records.iter().zip(&model) {
                    prop_assert_eq!(record.id.as_ref(), Some(id));
                    prop_assert_eq!(record.get("name"), Some(&json!(name)));
                }
            }
            Ok(())
        })?;
    }
}
