//! Result transformation and export engine.
//!
//! Pure functions that derive every presentation projection — columns,
//! paginated enriched rows, a JSON snapshot, a CSV export — from one
//! `ExecutionResult`, with no network or re-query dependency.

mod columns;
mod export;
mod view;

pub use columns::{derive_columns, ColumnDescriptor, DataTypeHint};
pub use export::{snapshot_json, to_csv};
pub use view::{
    enrich_row, paginate, record_key, total_pages, CellView, ChildRelationship, ResultView,
    RowView,
};

use serde_json::Value;

/// The tagged shape of one record field value.
///
/// Child collections arrive in two equivalent wire shapes: a non-empty array
/// of objects, or a wrapper object with a `records` array. Both classify to
/// `Children`; everything else is a scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueShape<'a> {
    /// A plain cell value (including null and unclassified containers).
    Scalar(&'a Value),
    /// The child records of a one-to-many relationship.
    Children(&'a [Value]),
}

impl ValueShape<'_> {
    /// Returns true for the `Children` variant.
    pub fn is_children(&self) -> bool {
        matches!(self, Self::Children(_))
    }
}

/// Classifies one field value at the data boundary.
///
/// This is the single place the two child-collection wire shapes are
/// recognized; downstream code consumes only the tagged form.
pub fn classify_value(value: &Value) -> ValueShape<'_> {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            ValueShape::Children(items)
        }
        Value::Object(map) => match map.get("records") {
            Some(Value::Array(items)) => ValueShape::Children(items),
            _ => ValueShape::Scalar(value),
        },
        _ => ValueShape::Scalar(value),
    }
}

/// Formats a field name as a human-readable column label.
///
/// Splits camel case by inserting a space before each uppercase letter,
/// replaces underscores with spaces, trims, and capitalizes the first
/// character.
pub fn format_label(field_name: &str) -> String {
    let mut spaced = String::with_capacity(field_name.len() + 4);
    for ch in field_name.chars() {
        if ch.is_uppercase() {
            spaced.push(' ');
            spaced.push(ch);
        } else if ch == '_' {
            spaced.push(' ');
        } else {
            spaced.push(ch);
        }
    }

    let trimmed = spaced.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Renders a scalar cell value as display text.
///
/// Nulls are blank, strings are used verbatim, and unclassified containers
/// (empty arrays, objects without a `records` array) fall back to compact
/// JSON.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
