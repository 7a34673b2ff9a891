//! Row enrichment, pagination, and the preview view model.
//!
//! `enrich_row` turns one record into a `RowView` with per-column cells and
//! detected child relationships; `ResultView` holds the per-result session
//! state (page, page size, expansion set).

use std::collections::HashSet;

use super::{classify_value, derive_columns, format_label, render_scalar};
use super::{ColumnDescriptor, ValueShape};
use crate::gateway::{ExecutionResult, Record};
use serde_json::Value;

/// One rendered cell of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellView {
    pub field_name: String,
    pub value: String,
}

/// A detected one-to-many relationship on a row.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRelationship {
    /// Field name the children arrived under.
    pub name: String,
    /// Display label including the child count, e.g. "Contacts (2)".
    pub label: String,
    /// The child records themselves.
    pub records: Vec<Record>,
    /// Columns derived from this relationship's own first child record.
    pub columns: Vec<ColumnDescriptor>,
}

/// An enriched record ready for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    /// 1-based absolute row number within the result.
    pub row_number: usize,
    /// Stable identifier used for expansion state.
    pub record_key: String,
    /// Primary display text for the row.
    pub display_name: String,
    /// One cell per derived column.
    pub cells: Vec<CellView>,
    /// Child relationships detected on this record.
    pub child_relationships: Vec<ChildRelationship>,
    /// True when any relationship was detected.
    pub has_children: bool,
    /// Whether the row is currently expanded.
    pub expanded: bool,
}

/// Number of pages for a record count at a page size.
pub fn total_pages(record_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    std::cmp::max(1, record_count.div_ceil(page_size))
}

/// Returns the records for one page, with the page number clamped to
/// `[1, total_pages]`.
pub fn paginate(records: &[Record], page_size: usize, page: usize) -> &[Record] {
    if page_size == 0 {
        return records;
    }
    let page = page.clamp(1, total_pages(records.len(), page_size));
    let start = (page - 1) * page_size;
    let end = std::cmp::min(start + page_size, records.len());
    if start >= records.len() {
        &[]
    } else {
        &records[start..end]
    }
}

/// Stable identifier for a record: its `Id` field, else a positional key.
pub fn record_key(record: &Record, index: usize) -> String {
    match record.get("Id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => format!("row-{}", index + 1),
    }
}

/// Enriches one record with row metadata, cell projections, and detected
/// child relationships.
///
/// `index` is the record's absolute position in the result. Each detected
/// relationship derives its own columns from its own first child record,
/// excluding any field whose value equals the parent's `Id` (the child's
/// back-reference to the parent).
pub fn enrich_row(record: &Record, index: usize, columns: &[ColumnDescriptor]) -> RowView {
    let row_number = index + 1;

    let cells = columns
        .iter()
        .map(|column| CellView {
            field_name: column.field_name.clone(),
            value: record
                .get(&column.field_name)
                .map(render_scalar)
                .unwrap_or_default(),
        })
        .collect();

    let parent_id = record.get("Id");
    let mut child_relationships = Vec::new();
    for (field, value) in record {
        if let ValueShape::Children(items) = classify_value(value) {
            child_relationships.push(build_relationship(field, items, parent_id));
        }
    }

    let display_name = match record.get("Name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => match parent_id {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => format!("Record {row_number}"),
        },
    };

    RowView {
        row_number,
        record_key: record_key(record, index),
        display_name,
        cells,
        has_children: !child_relationships.is_empty(),
        child_relationships,
        expanded: false,
    }
}

fn build_relationship(field: &str, items: &[Value], parent_id: Option<&Value>) -> ChildRelationship {
    let records: Vec<Record> = items
        .iter()
        .filter_map(|item| item.as_object().cloned())
        .collect();

    let columns = match records.first() {
        Some(first) => {
            let child_fields: Vec<String> = first
                .iter()
                .filter(|(_, value)| parent_id.map_or(true, |id| *value != id))
                .map(|(name, _)| name.clone())
                .collect();
            derive_columns(std::slice::from_ref(first), &child_fields)
        }
        None => Vec::new(),
    };

    ChildRelationship {
        name: field.to_string(),
        label: format!("{} ({})", format_label(field), records.len()),
        records,
        columns,
    }
}

/// Per-result preview session: the current result plus page, page size, and
/// expansion state.
///
/// Columns are derived once when a result is installed and stay stable
/// across page changes; the window math recomputes only when the record
/// count or page size changes.
pub struct ResultView {
    result: ExecutionResult,
    columns: Vec<ColumnDescriptor>,
    page: usize,
    page_size: usize,
    total_pages: usize,
    expanded: HashSet<String>,
}

impl ResultView {
    /// Creates an empty view with the given page size.
    pub fn new(page_size: usize) -> Self {
        Self {
            result: ExecutionResult::default(),
            columns: Vec::new(),
            page: 1,
            page_size,
            total_pages: 1,
            expanded: HashSet::new(),
        }
    }

    /// Atomically replaces the underlying result.
    ///
    /// Columns are re-derived, the expansion set is rebuilt empty, and the
    /// view returns to page 1.
    pub fn replace_result(&mut self, result: ExecutionResult) {
        self.columns = derive_columns(&result.records, &result.fields);
        self.total_pages = total_pages(result.record_count, self.page_size);
        self.expanded = HashSet::new();
        self.page = 1;
        self.result = result;
    }

    /// The current result.
    pub fn result(&self) -> &ExecutionResult {
        &self.result
    }

    /// The derived column set.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Current page (1-based).
    pub fn page(&self) -> usize {
        self.page
    }

    /// Current page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total pages for the current result and page size.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Moves to a page, clamped to the valid range.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages);
    }

    /// Changes the page size and recomputes the window.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        self.total_pages = total_pages(self.result.record_count, page_size);
        self.page = self.page.clamp(1, self.total_pages);
    }

    /// Toggles expansion for a record key.
    ///
    /// The set is keyed by stable record identifiers, so it survives
    /// pagination; it is rebuilt empty when the result is replaced.
    pub fn toggle_expanded(&mut self, key: &str) {
        if !self.expanded.remove(key) {
            self.expanded.insert(key.to_string());
        }
    }

    /// Whether a record key is expanded.
    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.contains(key)
    }

    /// Enriches the current page window, with absolute row numbers and
    /// expansion flags applied.
    pub fn page_rows(&self) -> Vec<RowView> {
        let offset = (self.page - 1) * self.page_size;
        paginate(&self.result.records, self.page_size, self.page)
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let mut row = enrich_row(record, offset + i, &self.columns);
                row.expanded = self.expanded.contains(&row.record_key);
                row
            })
            .collect()
    }
}
