//! Configuration loading integration tests.

use std::io::Write;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use db_vantage::config::Config;
use db_vantage::directory::{Directory, StaticDirectory};

#[test]
fn load_full_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
caller = "admin"

[gateway]
backend = "mock"

[impersonation]
poll_interval_ms = 250
max_polls = 8
result_ttl_secs = 30

[preview]
page_size = 25

[users.admin]
id = "005-admin"
name = "Admin"
can_impersonate = true

[queries.accounts]
object = "Account"
query = "SELECT Id, Name FROM Account WHERE Region = :region"

[queries.accounts.bindings]
region = "EMEA"
"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    assert_eq!(config.caller.as_deref(), Some("admin"));
    assert_eq!(config.gateway.backend, "mock");
    assert_eq!(config.impersonation.poll_interval_ms, 250);
    assert_eq!(config.impersonation.max_polls, 8);
    assert_eq!(config.preview.page_size, 25);

    let query = config.get_query("accounts").unwrap();
    assert_eq!(query.bindings.get("region").unwrap(), "EMEA");

    let directory = StaticDirectory::from_config(&config, "admin").unwrap();
    assert!(directory.caller().can_impersonate);
    assert_eq!(directory.query_config("accounts").unwrap().id, "accounts");
}

#[test]
fn invalid_toml_reports_path() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "queries = \"oops\"").unwrap();

    let err = Config::load_from_file(file.path()).unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
    assert!(err
        .to_string()
        .contains(file.path().to_str().unwrap()));
}

#[test]
fn missing_file_is_defaults_not_error() {
    let config = Config::load_from_file(std::path::Path::new("/no/such/vantage.toml")).unwrap();
    assert_eq!(config.impersonation.poll_interval_ms, 2000);
    assert_eq!(config.impersonation.max_polls, 30);
}
