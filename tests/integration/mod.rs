//! Integration tests for Vantage.

pub mod common;
pub mod config_test;
pub mod engine_test;
pub mod export_test;
pub mod orchestrator_test;
