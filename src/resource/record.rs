//! Records
//!
//! A record is a JSON object as served by the backend, with its identifier
//! split out so update and delete calls can address it.

use super::registry::ResourceSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Server-assigned identifier. Kept in the shape the backend sent it so
/// numeric ids go back out as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    pub fn is_empty(&self) -> bool {
        matches!(self, RecordId::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Text(s)
    }
}

/// Field values plus an optional id; without an id it is a draft
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft with every schema field set to its empty value
    pub fn blank(schema: &ResourceSchema) -> Self {
        let fields = schema
            .fields
            .iter()
            .map(|f| (f.key.clone(), f.empty_value()))
            .collect();
        Self { id: None, fields }
    }

    /// Copy of `self` for editing; schema fields the backend omitted are
    /// filled with empty values, extra fields are carried through untouched.
    pub fn to_draft(&self, schema: &ResourceSchema) -> Self {
        let mut draft = self.clone();
        for field in &schema.fields {
            draft
                .fields
                .entry(field.key.clone())
                .or_insert_with(|| field.empty_value());
        }
        draft
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// True once the backend has assigned a usable id
    pub fn is_persisted(&self) -> bool {
        self.id.as_ref().is_some_and(|id| !id.is_empty())
    }

    /// Parse one backend object
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_json(&self) -> Value {
        let mut map = self.fields.clone();
        if let Some(id) = &self.id {
            map.insert("id".to_string(), serde_json::to_value(id).unwrap_or(Value::Null));
        }
        Value::Object(map)
    }

    /// Body for a create call: the fields only
    pub fn to_json_without_id(&self) -> Value {
        let mut map = self.fields.clone();
        map.remove("id");
        Value::Object(map)
    }
}
