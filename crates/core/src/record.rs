//! Backend records and their projection into selector options.
//!
//! A [`Record`] is whatever object the backend sent, kept as-is. Records are never patched:
//! a refresh replaces them wholesale.

use crate::constants::MISSING_CELL;
use clinic_types::Identifier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One backend entity as a field mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns `None` unless `value` is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Scalar field as text. Strings are trimmed; blank strings, `null`, arrays and objects
    /// count as absent.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Like [`Record::text`] with `-` for absent values.
    pub fn display(&self, field: &str) -> String {
        self.text(field).unwrap_or_else(|| MISSING_CELL.to_owned())
    }

    /// Like [`Record::text`] with a caller-chosen fallback.
    pub fn display_or(&self, field: &str, fallback: &str) -> String {
        self.text(field).unwrap_or_else(|| fallback.to_owned())
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        match self.0.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        self.0.get(field)?.as_bool()
    }

    pub fn identifier(&self, field: &str) -> Option<Identifier> {
        self.text(field).and_then(|t| Identifier::new(t).ok())
    }

    /// Nested object field.
    pub fn record(&self, field: &str) -> Option<Record> {
        match self.0.get(field)? {
            Value::Object(map) => Some(Record(map.clone())),
            _ => None,
        }
    }

    /// Array-of-objects field. Non-object elements are skipped.
    pub fn records(&self, field: &str) -> Option<Vec<Record>> {
        match self.0.get(field)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|item| Record::from_value(item.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Joins the present text of several fields with a single space.
    pub fn joined(&self, fields: &[&str]) -> Option<String> {
        let parts: Vec<String> = fields.iter().filter_map(|f| self.text(f)).collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// One entry of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionItem {
    pub value: Identifier,
    pub label: String,
}

/// How records become options: which field is the value and which fields make the label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    value_field: String,
    label_fields: Vec<String>,
}

impl Projection {
    pub fn new(value_field: impl Into<String>, label_field: impl Into<String>) -> Self {
        Self {
            value_field: value_field.into(),
            label_fields: vec![label_field.into()],
        }
    }

    /// Label made of several fields joined by a space (`nombre apellido`).
    pub fn with_label_fields(value_field: impl Into<String>, label_fields: &[&str]) -> Self {
        Self {
            value_field: value_field.into(),
            label_fields: label_fields.iter().map(|f| (*f).to_owned()).collect(),
        }
    }

    /// Records without a usable value are dropped; a record without a label shows its value.
    pub fn project(&self, records: &[Record]) -> Vec<OptionItem> {
        let label_fields: Vec<&str> = self.label_fields.iter().map(String::as_str).collect();
        records
            .iter()
            .filter_map(|record| {
                let value = record.identifier(&self.value_field)?;
                let label = record
                    .joined(&label_fields)
                    .unwrap_or_else(|| value.to_string());
                Some(OptionItem { value, label })
            })
            .collect()
    }
}
