//! Transformation-engine integration tests.
//!
//! Exercises column derivation, pagination, row enrichment, and the view
//! session end to end over realistic nested result sets.

use pretty_assertions::assert_eq;
use serde_json::json;

use db_vantage::results::{derive_columns, enrich_row, ResultView};

use super::common::{record, result};

fn nested_accounts() -> db_vantage::gateway::ExecutionResult {
    result(
        vec![
            record(json!({
                "Id": "001", "Name": "Acme", "Industry": "Manufacturing",
                "Contacts": [
                    {"Id": "c01", "Name": "Jo Field", "AccountId": "001"},
                    {"Id": "c02", "Name": "Sam Reed", "AccountId": "001"}
                ]
            })),
            record(json!({
                "Id": "002", "Name": "Globex", "Industry": "Energy",
                "Contacts": {"records": [
                    {"Id": "c03", "Name": "Ada Wong", "AccountId": "002"}
                ]}
            })),
            record(json!({"Id": "003", "Name": "Initech", "Industry": "Software"})),
        ],
        &["Id", "Name", "Industry", "Contacts"],
    )
}

#[test]
fn derive_columns_is_idempotent_and_excludes_collections() {
    let res = nested_accounts();
    let first = derive_columns(&res.records, &res.fields);
    let second = derive_columns(&res.records, &res.fields);
    assert_eq!(first, second);

    let names: Vec<&str> = first.iter().map(|c| c.field_name.as_str()).collect();
    assert_eq!(names, vec!["Id", "Name", "Industry"]);
}

#[test]
fn both_wire_shapes_enrich_identically() {
    let res = nested_accounts();
    let columns = derive_columns(&res.records, &res.fields);

    // Record 0 uses the raw-array shape, record 1 the wrapper shape
    let raw = enrich_row(&res.records[0], 0, &columns);
    let wrapped = enrich_row(&res.records[1], 1, &columns);

    assert!(raw.has_children);
    assert!(wrapped.has_children);
    assert_eq!(raw.child_relationships[0].name, "Contacts");
    assert_eq!(wrapped.child_relationships[0].name, "Contacts");

    // Derived child columns agree regardless of the wire shape
    let raw_fields: Vec<&str> = raw.child_relationships[0]
        .columns
        .iter()
        .map(|c| c.field_name.as_str())
        .collect();
    let wrapped_fields: Vec<&str> = wrapped.child_relationships[0]
        .columns
        .iter()
        .map(|c| c.field_name.as_str())
        .collect();
    assert_eq!(raw_fields, wrapped_fields);
    assert_eq!(raw_fields, vec!["Id", "Name"], "back-reference excluded");
}

#[test]
fn view_session_over_nested_result() {
    let mut view = ResultView::new(2);
    view.replace_result(nested_accounts());

    assert_eq!(view.total_pages(), 2);
    assert_eq!(view.columns().len(), 3);

    let page1 = view.page_rows();
    assert_eq!(page1.len(), 2);
    assert_eq!(page1[0].display_name, "Acme");
    assert_eq!(page1[0].child_relationships[0].label, "Contacts (2)");

    view.set_page(2);
    let page2 = view.page_rows();
    assert_eq!(page2.len(), 1);
    assert_eq!(page2[0].row_number, 3);
    assert!(!page2[0].has_children);
}

#[test]
fn pagination_clamps_and_windows() {
    let records = (1..=25)
        .map(|i| record(json!({"Id": i.to_string(), "Name": format!("Rec {i}")})))
        .collect();
    let mut view = ResultView::new(10);
    view.replace_result(result(records, &["Id", "Name"]));

    assert_eq!(view.total_pages(), 3);

    view.set_page(3);
    assert_eq!(view.page_rows().len(), 5);

    // Page 4 clamps to page 3
    view.set_page(4);
    assert_eq!(view.page(), 3);
    assert_eq!(view.page_rows().len(), 5);
}

#[test]
fn empty_result_with_fields_is_not_an_error() {
    let mut view = ResultView::new(10);
    view.replace_result(result(vec![], &["Id", "Name"]));

    assert_eq!(view.columns().len(), 2);
    assert_eq!(view.columns()[0].label, "Id");
    assert!(view.page_rows().is_empty());
}

#[test]
fn expansion_keys_survive_pagination_and_reset_on_replace() {
    let records: Vec<_> = (1..=25)
        .map(|i| record(json!({"Id": format!("{i:03}"), "Name": format!("Rec {i}")})))
        .collect();
    let mut view = ResultView::new(10);
    view.replace_result(result(records.clone(), &["Id", "Name"]));

    view.toggle_expanded("015");
    view.set_page(2);
    let row = view
        .page_rows()
        .into_iter()
        .find(|r| r.record_key == "015")
        .unwrap();
    assert!(row.expanded);

    view.replace_result(result(records, &["Id", "Name"]));
    assert!(!view.is_expanded("015"));
}
