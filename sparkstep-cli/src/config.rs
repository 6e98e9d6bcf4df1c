//! Configuration module
//!
//! Handles CLI configuration: which service, project and region to talk to.

use sparkstep_client::JobServiceClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the job service
    pub endpoint: String,
    pub project_id: String,
    pub region: String,
    pub access_token: Option<String>,
}

impl Config {
    /// Client scoped to the configured project and region
    pub fn client(&self) -> JobServiceClient {
        tracing::debug!(endpoint = %self.endpoint, project = %self.project_id, region = %self.region, "using job service");
        let client = JobServiceClient::new(&self.endpoint, &self.project_id, &self.region);
        match &self.access_token {
            Some(token) if !token.is_empty() => client.with_access_token(token),
            _ => client,
        }
    }
}
