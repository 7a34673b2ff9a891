//! Vantage - a headless runner for saved relational queries with run-as
//! access verification.
//!
//! This library exposes the core modules for use in integration tests.

pub mod app;
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod impersonation;
pub mod logging;
pub mod results;
