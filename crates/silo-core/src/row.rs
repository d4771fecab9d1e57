//! Row and field value types for batch validation and loading.
//!
//! Upstream stages (spreadsheet parsing, unpivoting) hand the engine
//! batches of named-field rows. [`Row`] preserves source column order so
//! structural fingerprints stay deterministic.

use serde_json::Value;

/// A single field value: a schema-light tagged scalar.
///
/// This is the variant type the metadata detail payloads round-trip
/// through, so arbitrary source cells keep their structure without an
/// untyped blob.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric view of the value, parsing text if it looks numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Bool(_) | FieldValue::Null => None,
        }
    }

    /// Text view of the value. `None` for `Null`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Null => None,
        }
    }

    /// Convert to a `serde_json::Value` for detail payloads.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Null),
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

/// One row of named fields, in source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, FieldValue)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field. Later pushes with the same name shadow earlier ones
    /// for `get`, but both are preserved in iteration order.
    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push((name.into(), value));
    }

    /// Builder-style `push`.
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.push(name, value);
        self
    }

    /// Look up a field by name (last occurrence wins).
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Whether the named field is absent or `Null`.
    pub fn is_null(&self, name: &str) -> bool {
        self.get(name).map_or(true, FieldValue::is_null)
    }

    /// Column names in source order.
    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Convert to a JSON object (field order is lost; used for payloads).
    pub fn to_json(&self) -> Value {
        let map: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(n, v)| (n.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Build a row from a JSON object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let mut row = Row::new();
        for (name, v) in obj {
            row.push(name.clone(), FieldValue::from(v));
        }
        Some(row)
    }
}

#[cfg(test)]
#[path = "row_test.rs"]
mod tests;
