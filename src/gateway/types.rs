//! Wire and result types for the execution gateway.
//!
//! The gateway speaks camelCase JSON; everything downstream of it consumes
//! the `ExecutionResult` shape.

use crate::error::{Result, VantageError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single record: field name to value, in wire order.
///
/// Values may be scalars or nested child collections; classification happens
/// in the results engine, not here.
pub type Record = serde_json::Map<String, Value>;

/// Request body sent to the execution gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    /// Query configuration id, if running a predefined query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,

    /// Parameter bindings as a JSON object string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings_json: Option<String>,

    /// Ad hoc query text overriding the configuration's query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_override: Option<String>,

    /// Identity to run the query as, for impersonated runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_as_user_id: Option<String>,
}

/// Response body returned by the execution gateway.
///
/// Query-level failure travels as data (`success: false` plus
/// `error_message`), never as a transport error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub success: bool,

    #[serde(default)]
    pub records: Vec<Record>,

    #[serde(default)]
    pub fields: Vec<String>,

    #[serde(default)]
    pub record_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl GatewayResponse {
    /// Converts the response into an `ExecutionResult`, or the gateway's
    /// error message when the query failed.
    pub fn into_result(self) -> std::result::Result<ExecutionResult, String> {
        if !self.success {
            return Err(self
                .error_message
                .unwrap_or_else(|| "Query execution failed".to_string()));
        }
        Ok(ExecutionResult {
            records: self.records,
            fields: self.fields,
            record_count: self.record_count,
            execution_time_ms: self.execution_time_ms,
            run_as_user_name: self.run_as_user_name,
        })
    }
}

/// The result of one successful query execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Records in wire order.
    pub records: Vec<Record>,

    /// Declared field names, in declared order.
    pub fields: Vec<String>,

    /// Number of records returned.
    pub record_count: usize,

    /// Gateway-reported execution time, if present.
    pub execution_time_ms: Option<u64>,

    /// Display name of the impersonated identity, for run-as results.
    pub run_as_user_name: Option<String>,
}

impl ExecutionResult {
    /// Creates a result from records and declared fields.
    pub fn with_data(records: Vec<Record>, fields: Vec<String>) -> Self {
        let record_count = records.len();
        Self {
            records,
            fields,
            record_count,
            execution_time_ms: None,
            run_as_user_name: None,
        }
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True only for the degenerate-but-valid zero-records, zero-fields state.
    pub fn is_degenerate(&self) -> bool {
        self.records.is_empty() && self.fields.is_empty()
    }
}

/// Validated parameter bindings: a JSON object whose values are all scalars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBindings(serde_json::Map<String, Value>);

impl ParameterBindings {
    /// Parses a bindings JSON string, rejecting non-objects and non-scalar
    /// values.
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| VantageError::validation(format!("Unparsable bindings JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validates an already-parsed JSON value as bindings.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(VantageError::validation(
                "Parameter bindings must be a JSON object",
            ));
        };
        for (key, val) in &map {
            if matches!(val, Value::Array(_) | Value::Object(_)) {
                return Err(VantageError::validation(format!(
                    "Binding '{key}' must be a scalar"
                )));
            }
        }
        Ok(Self(map))
    }

    /// Returns bindings where `self` wins over `base` on key collisions.
    pub fn merged_over(&self, base: &ParameterBindings) -> ParameterBindings {
        let mut merged = base.0.clone();
        for (key, val) in &self.0 {
            merged.insert(key.clone(), val.clone());
        }
        ParameterBindings(merged)
    }

    /// Serializes the bindings back to a JSON object string for the wire.
    pub fn to_json(&self) -> String {
        // An object of scalars always serializes
        serde_json::to_string(&Value::Object(self.0.clone())).unwrap_or_else(|_| "{}".to_string())
    }

    /// Inserts a single scalar binding.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        if matches!(value, Value::Array(_) | Value::Object(_)) {
            return Err(VantageError::validation("Bindings must be scalars"));
        }
        self.0.insert(key.into(), value);
        Ok(())
    }

    /// Returns true if no bindings are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Looks up a binding by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}
