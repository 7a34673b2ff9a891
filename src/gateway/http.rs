//! HTTP execution gateway client.
//!
//! Posts `GatewayRequest` bodies as JSON to a configured endpoint and
//! deserializes `GatewayResponse` bodies back.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::{ExecutionGateway, GatewayRequest, GatewayResponse};
use crate::config::GatewayConfig;
use crate::error::{Result, VantageError};

/// HTTP gateway client.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    endpoint: Url,
    auth_token: Option<String>,
    client: Client,
}

impl HttpGateway {
    /// Creates a client from the `[gateway]` config section.
    ///
    /// If `auth_token_env` names an environment variable, its value is sent
    /// as a bearer token on every request.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;

        let auth_token = match &config.auth_token_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                VantageError::config(format!("Environment variable {var} not set"))
            })?),
            None => None,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VantageError::gateway(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            auth_token,
            client,
        })
    }
}

#[async_trait]
impl ExecutionGateway for HttpGateway {
    async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VantageError::gateway(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VantageError::gateway(format!(
                "Gateway returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .json::<GatewayResponse>()
            .await
            .map_err(|e| VantageError::gateway(format!("Invalid gateway response: {e}")))
    }
}
