//! Column derivation from an execution result.

use super::{classify_value, format_label};
use crate::gateway::Record;
use serde_json::Value;

/// Presentation metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Field name as declared by the result.
    pub field_name: String,
    /// Human-readable label.
    pub label: String,
    /// Coarse rendering hint.
    pub data_type_hint: DataTypeHint,
}

impl ColumnDescriptor {
    /// Builds a descriptor for a field, inferring the hint from a sample
    /// value when one is available.
    pub fn for_field(field_name: &str, sample: Option<&Value>) -> Self {
        Self {
            field_name: field_name.to_string(),
            label: format_label(field_name),
            data_type_hint: sample.map(DataTypeHint::for_value).unwrap_or_default(),
        }
    }
}

/// Coarse data-type hint for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataTypeHint {
    #[default]
    Text,
    Number,
    Boolean,
}

impl DataTypeHint {
    /// Infers a hint from a sample value.
    pub fn for_value(value: &Value) -> Self {
        match value {
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            _ => Self::Text,
        }
    }
}

/// Derives the column set for a result.
///
/// Declared field order is preserved. A field is excluded whenever its value
/// on any observed record classifies as a child collection. The derivation
/// is pure and idempotent, so it runs once per result and stays stable
/// across page changes.
pub fn derive_columns(records: &[Record], declared_fields: &[String]) -> Vec<ColumnDescriptor> {
    declared_fields
        .iter()
        .filter(|field| {
            !records
                .iter()
                .filter_map(|record| record.get(field.as_str()))
                .any(|value| classify_value(value).is_children())
        })
        .map(|field| {
            // First non-null value seeds the type hint
            let sample = records
                .iter()
                .filter_map(|record| record.get(field.as_str()))
                .find(|value| !value.is_null());
            ColumnDescriptor::for_field(field, sample)
        })
        .collect()
}
