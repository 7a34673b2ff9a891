//! Shared helpers for the integration tests.

use std::sync::Arc;
use std::time::Duration;

use db_vantage::config::Config;
use db_vantage::directory::StaticDirectory;
use db_vantage::gateway::{ExecutionResult, MockGateway, Record};
use db_vantage::impersonation::Orchestrator;

/// A roster and query catalog used across the orchestration tests.
pub fn test_config() -> Config {
    toml::from_str(
        r#"
[users.admin]
id = "005-admin"
name = "Admin"
can_impersonate = true

[users.jo]
id = "005-jo"
name = "Jo Field"

[queries.accounts]
object = "Account"
query = "SELECT Id, Name, Industry FROM Account"
"#,
    )
    .unwrap()
}

/// Builds an orchestrator over the given mock gateway with a 60 s TTL.
pub fn test_orchestrator(gateway: MockGateway, caller: &str) -> Arc<Orchestrator> {
    test_orchestrator_with_ttl(gateway, caller, Duration::from_secs(60))
}

/// Builds an orchestrator with an explicit cache TTL.
pub fn test_orchestrator_with_ttl(
    gateway: MockGateway,
    caller: &str,
    ttl: Duration,
) -> Arc<Orchestrator> {
    let directory = Arc::new(StaticDirectory::from_config(&test_config(), caller).unwrap());
    Arc::new(Orchestrator::new(Arc::new(gateway), directory, ttl))
}

/// Builds a record from a JSON object literal.
pub fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

/// Builds a result from records and declared field names.
pub fn result(records: Vec<Record>, fields: &[&str]) -> ExecutionResult {
    ExecutionResult::with_data(records, fields.iter().map(|s| s.to_string()).collect())
}
