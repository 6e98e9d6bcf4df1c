//! Sparkstep HTTP Client
//!
//! A typed HTTP client for the remote job API of a managed Spark-on-YARN
//! service. Shared by the runner (submit, poll, cancel) and the operator CLI.
//!
//! The client assumes an already-issued access token; it never acquires or
//! refreshes credentials itself.
//!
//! # Example
//!
//! ```no_run
//! use sparkstep_client::JobServiceClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sparkstep_client::ClientError> {
//!     let client = JobServiceClient::new("https://dataproc.example.com", "my-project", "us-central1");
//!
//!     let job = client.get_job("job-1234").await?;
//!     println!("{} is {}", job.reference.job_id, job.status.state);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;

pub use error::{ClientError, Result};

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

/// HTTP client for the remote job API, scoped to one project and region
#[derive(Debug, Clone)]
pub struct JobServiceClient {
    /// Base URL of the service (e.g., "https://dataproc.googleapis.com")
    base_url: String,
    project_id: String,
    region: String,
    /// Bearer token attached to every request
    access_token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl JobServiceClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the job API
    /// * `project_id` - Project owning the jobs
    /// * `region` - Region the cluster lives in
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::with_client(base_url, project_id, region, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        region: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            region: region.into(),
            access_token: None,
            client,
        }
    }

    /// Attach a bearer token to every request
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Collection URL for jobs in this project and region
    fn jobs_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/regions/{}/jobs",
            self.base_url, self.project_id, self.region
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
