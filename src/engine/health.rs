//! Engine health probing

use super::endpoint::EngineEndpoint;
use crate::error::{GatewayError, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::trace;

/// Timeout for a single health request
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Path the engine answers with 200 once a model is loaded
pub const HEALTH_PATH: &str = "/health";

/// Short-timeout GET against the engine health endpoint
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client,
    url: String,
}

impl HealthProbe {
    pub fn new(endpoint: &EngineEndpoint) -> Result<Self> {
        Self::with_timeout(endpoint, HEALTH_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &EngineEndpoint, timeout: Duration) -> Result<Self> {
        let url = endpoint.url(HEALTH_PATH);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::from_transport(url.clone(), e))?;
        Ok(Self { client, url })
    }

    /// One probe. Non-200 answers are `UpstreamStatus`.
    pub fn check(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| GatewayError::from_transport(self.url.clone(), e))?;

        let status = response.status();
        if status.as_u16() == 200 {
            Ok(())
        } else {
            Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            })
        }
    }

    /// `true` only on HTTP 200; every failure collapses to `false`
    pub fn is_healthy(&self) -> bool {
        match self.check() {
            Ok(()) => true,
            Err(e) => {
                trace!(url = %self.url, error = %e, "Health probe failed");
                false
            }
        }
    }
}
