//! Execution gateway abstraction for Vantage.
//!
//! Provides a trait-based interface to the backend that actually runs
//! queries, allowing the HTTP gateway and the in-memory mock to be used
//! interchangeably.

mod http;
mod mock;
mod types;

pub use http::HttpGateway;
pub use mock::{FailingGateway, MockGateway};
pub use types::{ExecutionResult, GatewayRequest, GatewayResponse, ParameterBindings, Record};

use crate::config::GatewayConfig;
use crate::error::{Result, VantageError};
use async_trait::async_trait;
use std::sync::Arc;

/// Supported gateway backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayBackend {
    #[default]
    Http,
    Mock,
}

impl GatewayBackend {
    /// Returns the backend as a string for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Mock => "mock",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(Self::Http),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Creates a gateway client for the given configuration.
///
/// This is the central factory function for gateway access.
pub fn connect(config: &GatewayConfig) -> Result<Arc<dyn ExecutionGateway>> {
    let backend = GatewayBackend::parse(&config.backend).ok_or_else(|| {
        VantageError::config(format!("Unknown gateway backend '{}'", config.backend))
    })?;

    match backend {
        GatewayBackend::Http => {
            let client = HttpGateway::from_config(config)?;
            Ok(Arc::new(client))
        }
        GatewayBackend::Mock => Ok(Arc::new(MockGateway::with_demo_data())),
    }
}

/// Trait defining the interface to the execution gateway.
///
/// `Err` is reserved for transport faults; a query that ran and failed
/// comes back as `GatewayResponse { success: false, .. }`.
#[async_trait]
pub trait ExecutionGateway: Send + Sync + std::fmt::Debug {
    /// Executes one query, optionally under a different identity.
    async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse>;
}
