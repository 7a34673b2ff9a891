//! Export integration tests.
//!
//! Covers the JSON snapshot envelope and both CSV modes against the
//! documented row-count and header properties.

use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use db_vantage::results::{snapshot_json, to_csv};

use super::common::{record, result};

fn timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T10:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn json_snapshot_round_trips_record_count() {
    let res = result(
        vec![
            record(json!({"Id": "1", "Name": "Acme"})),
            record(json!({"Id": "2", "Name": "Globex"})),
        ],
        &["Id", "Name"],
    );

    let parsed: Value = serde_json::from_str(&snapshot_json(&res, timestamp())).unwrap();
    assert_eq!(
        parsed["records"].as_array().unwrap().len(),
        res.records.len()
    );
    assert_eq!(parsed["metadata"]["totalRecords"], 2);
    assert_eq!(parsed["metadata"]["fields"], json!(["Id", "Name"]));
    assert_eq!(
        parsed["metadata"]["exportTimestamp"],
        "2024-03-01T10:30:00+00:00"
    );
}

#[test]
fn flat_csv_has_one_row_per_record_plus_header() {
    let res = result(
        vec![
            record(json!({"Id": "1", "Name": "Acme"})),
            record(json!({"Id": "2", "Name": "Globex"})),
            record(json!({"Id": "3", "Name": "Initech"})),
        ],
        &["Id", "Name"],
    );
    let csv = to_csv(&res);
    assert_eq!(csv.lines().count(), res.records.len() + 1);
}

#[test]
fn flattened_csv_header_excludes_back_reference() {
    // The canonical scenario from the engine contract
    let res = result(
        vec![record(json!({
            "Id": "1", "Name": "Acme",
            "Contacts": [{"Id": "c1", "Name": "Jo", "AccountId": "1"}]
        }))],
        &["Id", "Name"],
    );

    let csv = to_csv(&res);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Parent_Id,Parent_Name,RelationshipType,Child_Id,Child_Name"
    );
    assert!(!lines[0].contains("AccountId"));
    assert_eq!(lines[1], "1,Acme,Contacts,c1,Jo");
}

#[test]
fn flattened_csv_row_count_property() {
    // 1 + sum of max(1, childCount) over all records
    let res = result(
        vec![
            record(json!({
                "Id": "1", "Name": "Acme",
                "Contacts": [
                    {"Id": "c1", "Name": "Jo", "AccountId": "1"},
                    {"Id": "c2", "Name": "Sam", "AccountId": "1"}
                ]
            })),
            record(json!({"Id": "2", "Name": "Globex"})),
        ],
        &["Id", "Name"],
    );

    let csv = to_csv(&res);
    assert_eq!(csv.lines().count(), 1 + 2 + 1);

    // The childless parent keeps exactly one all-blank child row
    let last = csv.lines().last().unwrap();
    assert_eq!(last, "2,Globex,,,");
}

#[test]
fn csv_quotes_rfc4180_style() {
    let res = result(
        vec![record(json!({
            "Id": "1",
            "Name": "Acme, \"The\" Corp",
            "Note": "line one\nline two"
        }))],
        &["Id", "Name", "Note"],
    );
    let csv = to_csv(&res);
    assert!(csv.contains(r#""Acme, ""The"" Corp""#));
    assert!(csv.contains("\"line one\nline two\""));
}

#[test]
fn csv_empty_result_is_header_only() {
    let res = result(vec![], &["Id", "Name"]);
    assert_eq!(to_csv(&res), "Id,Name");
}

#[test]
fn exports_never_fail_on_degenerate_input() {
    let res = db_vantage::gateway::ExecutionResult::default();
    assert_eq!(to_csv(&res), "");

    let parsed: Value = serde_json::from_str(&snapshot_json(&res, timestamp())).unwrap();
    assert_eq!(parsed["metadata"]["totalRecords"], 0);
}
