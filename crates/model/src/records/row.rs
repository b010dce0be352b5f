use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

/// A single row as produced by a row source: the column values in the order
/// the query returned them. Rows are never mutated after they are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowData {
    entity: String,
    field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(entity: &str, field_values: Vec<FieldValue>) -> Self {
        RowData {
            entity: entity.to_string(),
            field_values,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn field_values(&self) -> &[FieldValue] {
        &self.field_values
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Column name to value, for printing rows as JSON objects.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .field_values
            .iter()
            .map(|f| (f.name.clone(), json_value(&f.value)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(v) => (*v).into(),
        Value::Uint(v) => (*v).into(),
        Value::Float(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Decimal(v) => serde_json::Value::String(v.to_string()),
        Value::String(v) => serde_json::Value::String(v.clone()),
        Value::Boolean(v) => (*v).into(),
        Value::Uuid(v) => serde_json::Value::String(v.to_string()),
        Value::Null => serde_json::Value::Null,
    }
}
