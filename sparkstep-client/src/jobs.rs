//! Job-related API endpoints

use reqwest::Method;
use sparkstep_core::domain::job::RemoteJob;
use sparkstep_core::dto::job::{ListJobsQuery, ListJobsResponse, SubmitJobRequest};
use tracing::debug;

use crate::JobServiceClient;
use crate::error::{ClientError, Result};

impl JobServiceClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Submit a job
    ///
    /// Submitting twice with the same `request_id` returns the job created by
    /// the first call.
    ///
    /// # Arguments
    /// * `req` - The job document and its deduplication id
    ///
    /// # Returns
    /// The created (or previously created) job
    pub async fn submit_job(&self, req: &SubmitJobRequest) -> Result<RemoteJob> {
        let url = format!("{}:submit", self.jobs_url());
        debug!(request_id = %req.request_id, "submitting job");
        let response = self.request(Method::POST, &url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    ///
    /// # Arguments
    /// * `job_id` - The job id
    ///
    /// # Returns
    /// The job, including its current status
    pub async fn get_job(&self, job_id: &str) -> Result<RemoteJob> {
        let url = self.job_url(job_id)?;
        let response = self.request(Method::GET, &url).send().await?;

        self.handle_response(response).await
    }

    /// Request cancellation of a job
    ///
    /// The remote side acknowledges asynchronously; the returned job usually
    /// reports `CANCEL_PENDING`.
    pub async fn cancel_job(&self, job_id: &str) -> Result<RemoteJob> {
        let url = format!("{}:cancel", self.job_url(job_id)?);
        debug!(job_id, "cancelling job");
        let response = self
            .request(Method::POST, &url)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Job Listing
    // =============================================================================

    /// List one page of jobs
    pub async fn list_jobs(&self, query: &ListJobsQuery) -> Result<ListJobsResponse> {
        let url = self.jobs_url();
        let response = self.request(Method::GET, &url).query(query).send().await?;

        self.handle_response(response).await
    }

    /// List all jobs matching `query`, following page tokens
    pub async fn list_all_jobs(&self, query: &ListJobsQuery) -> Result<Vec<RemoteJob>> {
        let mut jobs = Vec::new();
        let mut page = self.list_jobs(query).await?;

        loop {
            jobs.append(&mut page.jobs);
            match page.next_page_token.take().filter(|t| !t.is_empty()) {
                Some(token) => page = self.list_jobs(&query.with_page_token(token)).await?,
                None => break,
            }
        }

        Ok(jobs)
    }

    fn job_url(&self, job_id: &str) -> Result<String> {
        if job_id.is_empty() || job_id.contains('/') {
            return Err(ClientError::InvalidRequest(format!(
                "invalid job id: {job_id:?}"
            )));
        }
        Ok(format!("{}/{}", self.jobs_url(), job_id))
    }
}
