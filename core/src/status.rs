//! Deployment status endpoints shown on the home page.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::HealthCheck;

pub const HEALTH_PATH: &str = "/health";
pub const ENVIRONMENT_PATH: &str = "/api/environment";
pub const PING_PATH: &str = "/api/test";

#[derive(Debug, Clone, Copy)]
pub struct StatusApi<'a> {
    client: &'a ApiClient,
}

impl<'a> StatusApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Liveness check. Only the 2xx matters; a body that is not a
    /// `HealthCheck` still counts as healthy and yields `None`.
    pub fn health(&self) -> Result<Option<HealthCheck>, ApiError> {
        let response = self.client.execute(self.client.build(HttpMethod::Get, HEALTH_PATH))?;
        Ok(self.client.parse(response).ok())
    }

    /// Informational description of the deployment, passed through verbatim.
    pub fn environment(&self) -> Result<serde_json::Value, ApiError> {
        let response = self
            .client
            .execute(self.client.build(HttpMethod::Get, ENVIRONMENT_PATH))?;
        self.client.parse(response)
    }

    /// Backend reachability check.
    pub fn ping(&self) -> Result<serde_json::Value, ApiError> {
        let response = self.client.execute(self.client.build(HttpMethod::Get, PING_PATH))?;
        self.client.parse(response)
    }
}
