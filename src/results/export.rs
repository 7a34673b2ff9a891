//! JSON and CSV exports of an execution result.
//!
//! Export operations never fail on malformed input; they fall back to a
//! documented sentinel (`"{}"` for JSON, an empty string for CSV) and leave
//! error surfacing to the caller.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{classify_value, derive_columns, format_label, render_scalar, ValueShape};
use crate::gateway::{ExecutionResult, Record};

/// Serializes a result snapshot as 2-space-indented JSON.
///
/// The envelope is `{"metadata": {"totalRecords", "fields",
/// "exportTimestamp"}, "records"}` with an RFC 3339 timestamp. Returns
/// `"{}"` on internal failure rather than erroring.
pub fn snapshot_json(result: &ExecutionResult, exported_at: DateTime<Utc>) -> String {
    let snapshot = json!({
        "metadata": {
            "totalRecords": result.record_count,
            "fields": result.fields,
            "exportTimestamp": exported_at.to_rfc3339(),
        },
        "records": result.records,
    });
    serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".to_string())
}

/// Renders a result as CSV.
///
/// With no child relationship anywhere in the set this is a plain table:
/// header plus one row per record over the parent columns. As soon as any
/// record carries a child relationship the whole export switches to a
/// flattened join: `Parent_<label>…, RelationshipType, Child_<label>…`,
/// one row per child per parent, and exactly one all-blank child row for
/// parents without children. Child columns are the union of fields over
/// every child of every relationship of every parent, in first-seen order,
/// minus each parent's back-reference field.
///
/// Quoting is RFC 4180 (fields quoted when needed, embedded quotes
/// doubled); rows are newline-joined with no trailing newline. Returns an
/// empty string on internal failure.
pub fn to_csv(result: &ExecutionResult) -> String {
    write_csv(result).unwrap_or_default()
}

fn write_csv(result: &ExecutionResult) -> Option<String> {
    if result.records.is_empty() && result.fields.is_empty() {
        return Some(String::new());
    }

    let parent_columns = derive_columns(&result.records, &result.fields);
    let joins: Vec<ParentJoin> = result.records.iter().map(ParentJoin::detect).collect();
    let has_any_children = joins.iter().any(|join| !join.relationships.is_empty());

    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    if !has_any_children {
        let header: Vec<&str> = parent_columns.iter().map(|c| c.label.as_str()).collect();
        writer.write_record(&header).ok()?;

        for record in &result.records {
            let row: Vec<String> = parent_columns
                .iter()
                .map(|column| cell_text(record, &column.field_name))
                .collect();
            writer.write_record(&row).ok()?;
        }
    } else {
        let child_fields = child_field_union(&joins);

        let mut header: Vec<String> = parent_columns
            .iter()
            .map(|c| format!("Parent_{}", c.label))
            .collect();
        header.push("RelationshipType".to_string());
        header.extend(child_fields.iter().map(|f| format!("Child_{}", format_label(f))));
        writer.write_record(&header).ok()?;

        for join in &joins {
            let parent_cells: Vec<String> = parent_columns
                .iter()
                .map(|column| cell_text(join.record, &column.field_name))
                .collect();

            let mut children: Vec<(&str, &Record)> = Vec::new();
            for (name, records) in &join.relationships {
                for child in records {
                    children.push((name.as_str(), child));
                }
            }

            if children.is_empty() {
                // One all-blank child row keeps the parent visible
                let mut row = parent_cells.clone();
                row.push(String::new());
                row.extend(std::iter::repeat(String::new()).take(child_fields.len()));
                writer.write_record(&row).ok()?;
            } else {
                for (relationship, child) in children {
                    let mut row = parent_cells.clone();
                    row.push(relationship.to_string());
                    for field in &child_fields {
                        row.push(match child.get(field.as_str()) {
                            Some(value) if !join.is_back_reference(value) => render_scalar(value),
                            _ => String::new(),
                        });
                    }
                    writer.write_record(&row).ok()?;
                }
            }
        }
    }

    let bytes = writer.into_inner().ok()?;
    let mut text = String::from_utf8(bytes).ok()?;
    while text.ends_with('\n') || text.ends_with('\r') {
        text.pop();
    }
    Some(text)
}

/// One parent record with its detected relationships.
struct ParentJoin<'a> {
    record: &'a Record,
    parent_id: Option<&'a Value>,
    relationships: Vec<(String, Vec<&'a Record>)>,
}

impl<'a> ParentJoin<'a> {
    fn detect(record: &'a Record) -> Self {
        let mut relationships = Vec::new();
        for (field, value) in record {
            if let ValueShape::Children(items) = classify_value(value) {
                let children: Vec<&Record> =
                    items.iter().filter_map(|item| item.as_object()).collect();
                relationships.push((field.clone(), children));
            }
        }
        Self {
            record,
            parent_id: record.get("Id"),
            relationships,
        }
    }

    /// A child value equal to the parent's id is its back-reference.
    fn is_back_reference(&self, value: &Value) -> bool {
        self.parent_id.map_or(false, |id| value == id)
    }
}

/// Union of child fields across every relationship of every parent, in
/// first-seen order, minus back-references.
fn child_field_union(joins: &[ParentJoin]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for join in joins {
        for (_, children) in &join.relationships {
            for child in children {
                for (field, value) in child.iter() {
                    if join.is_back_reference(value) {
                        continue;
                    }
                    if !fields.iter().any(|f| f == field) {
                        fields.push(field.clone());
                    }
                }
            }
        }
    }
    fields
}

fn cell_text(record: &Record, field: &str) -> String {
    record.get(field).map(render_scalar).unwrap_or_default()
}
