//! Mock execution gateway for testing and offline demo runs.
//!
//! Returns canned responses per query configuration, simulates per-user
//! access denials, and can add artificial latency for polling tests.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

use super::{ExecutionGateway, GatewayRequest, GatewayResponse, Record};
use crate::error::Result;

/// A mock gateway that returns predefined results.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    /// Canned successful responses keyed by config id.
    responses: HashMap<String, GatewayResponse>,
    /// User ids whose impersonated runs are denied, with the denial message.
    denied_users: HashMap<String, String>,
    /// Display names for run-as users.
    user_names: HashMap<String, String>,
    /// Artificial latency before every response.
    latency: Option<Duration>,
}

impl MockGateway {
    /// Creates an empty mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock gateway with a small nested demo dataset.
    pub fn with_demo_data() -> Self {
        let records: Vec<Record> = [
            json!({
                "Id": "001", "Name": "Acme", "Industry": "Manufacturing",
                "Contacts": [
                    {"Id": "c01", "Name": "Jo Field", "AccountId": "001"},
                    {"Id": "c02", "Name": "Sam Reed", "AccountId": "001"}
                ]
            }),
            json!({
                "Id": "002", "Name": "Globex", "Industry": "Energy",
                "Contacts": {"records": [
                    {"Id": "c03", "Name": "Ada Wong", "AccountId": "002"}
                ]}
            }),
            json!({"Id": "003", "Name": "Initech", "Industry": "Software"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap_or_default())
        .collect();

        let mut mock = Self::new();
        mock.add_response(
            "accounts",
            GatewayResponse {
                success: true,
                record_count: records.len(),
                records,
                fields: vec![
                    "Id".to_string(),
                    "Name".to_string(),
                    "Industry".to_string(),
                    "Contacts".to_string(),
                ],
                execution_time_ms: Some(12),
                ..GatewayResponse::default()
            },
        );
        mock
    }

    /// Registers a canned response for a config id.
    pub fn add_response(&mut self, config_id: impl Into<String>, response: GatewayResponse) {
        self.responses.insert(config_id.into(), response);
    }

    /// Marks a user id as denied, with the message the backend would raise.
    pub fn deny_user(&mut self, user_id: impl Into<String>, message: impl Into<String>) {
        self.denied_users.insert(user_id.into(), message.into());
    }

    /// Registers a display name for a run-as user id.
    pub fn add_user_name(&mut self, user_id: impl Into<String>, name: impl Into<String>) {
        self.user_names.insert(user_id.into(), name.into());
    }

    /// Adds artificial latency before every response.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn failure(message: impl Into<String>) -> GatewayResponse {
        GatewayResponse {
            success: false,
            error_message: Some(message.into()),
            ..GatewayResponse::default()
        }
    }
}

#[async_trait]
impl ExecutionGateway for MockGateway {
    async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(user_id) = &request.run_as_user_id {
            if let Some(message) = self.denied_users.get(user_id) {
                return Ok(Self::failure(message.clone()));
            }
        }

        let mut response = match &request.config_id {
            Some(config_id) => match self.responses.get(config_id) {
                Some(canned) => canned.clone(),
                None => Self::failure(format!("Unknown query configuration '{config_id}'")),
            },
            None if request.query_override.is_some() => GatewayResponse {
                success: true,
                ..GatewayResponse::default()
            },
            None => Self::failure("No query configuration or override given"),
        };

        if response.success {
            if let Some(user_id) = &request.run_as_user_id {
                response.run_as_user_name = Some(
                    self.user_names
                        .get(user_id)
                        .cloned()
                        .unwrap_or_else(|| user_id.clone()),
                );
            }
        }

        Ok(response)
    }
}

/// A gateway whose every call fails at the transport level.
#[derive(Debug, Clone, Default)]
pub struct FailingGateway;

#[async_trait]
impl ExecutionGateway for FailingGateway {
    async fn execute(&self, _request: &GatewayRequest) -> Result<GatewayResponse> {
        Err(crate::error::VantageError::gateway(
            "Simulated transport failure",
        ))
    }
}
