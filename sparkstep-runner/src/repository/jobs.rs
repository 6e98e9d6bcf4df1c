//! Jobs repository
//!
//! Handles communication with the remote job API:
//! - Submitting job documents
//! - Fetching job status
//! - Requesting cancellation
//! - Finding jobs created by an earlier submission of the same spec

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sparkstep_client::{ClientError, JobServiceClient};
use sparkstep_core::domain::job::RemoteJob;
use sparkstep_core::domain::key::RequestKey;
use sparkstep_core::dto::job::{ListJobsQuery, SubmitJobRequest};
use tracing::debug;

/// Repository trait for the remote job API
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Submits a job document
    async fn submit(&self, request: &SubmitJobRequest) -> Result<RemoteJob, ClientError>;

    /// Fetches a job with its current status
    async fn get(&self, job_id: &str) -> Result<RemoteJob, ClientError>;

    /// Requests cancellation of a job
    async fn cancel(&self, job_id: &str) -> Result<RemoteJob, ClientError>;

    /// Jobs on `cluster_name` labelled with `key`, in any state
    async fn find_by_key(
        &self,
        cluster_name: &str,
        key: &RequestKey,
    ) -> Result<Vec<RemoteJob>, ClientError>;
}

/// HTTP implementation of JobRepository
///
/// Remembers the jobs it created so a lookup straight after a create does
/// not depend on the remote listing having caught up.
pub struct HttpJobRepository {
    client: Arc<JobServiceClient>,
    created: Mutex<HashMap<String, String>>,
}

impl HttpJobRepository {
    /// Creates a new HTTP job repository
    pub fn new(client: Arc<JobServiceClient>) -> Self {
        debug!(
            "Job repository for {}/{} at {}",
            client.project_id(),
            client.region(),
            client.base_url()
        );
        Self {
            client,
            created: Mutex::new(HashMap::new()),
        }
    }

    fn remembered(&self, key: &RequestKey) -> Option<String> {
        self.created
            .lock()
            .ok()
            .and_then(|created| created.get(key.as_str()).cloned())
    }
}

#[async_trait]
impl JobRepository for HttpJobRepository {
    async fn submit(&self, request: &SubmitJobRequest) -> Result<RemoteJob, ClientError> {
        let job = self.client.submit_job(request).await?;

        if let Some(key) = job.request_key()
            && let Ok(mut created) = self.created.lock()
        {
            created.insert(key.to_string(), job.reference.job_id.clone());
        }

        Ok(job)
    }

    async fn get(&self, job_id: &str) -> Result<RemoteJob, ClientError> {
        self.client.get_job(job_id).await
    }

    async fn cancel(&self, job_id: &str) -> Result<RemoteJob, ClientError> {
        self.client.cancel_job(job_id).await
    }

    async fn find_by_key(
        &self,
        cluster_name: &str,
        key: &RequestKey,
    ) -> Result<Vec<RemoteJob>, ClientError> {
        let jobs = self
            .client
            .list_all_jobs(&ListJobsQuery::by_request_key(cluster_name, key))
            .await?;

        if !jobs.is_empty() {
            return Ok(jobs);
        }

        match self.remembered(key) {
            Some(job_id) => {
                debug!("Listing lags behind create, fetching job {} directly", job_id);
                Ok(vec![self.client.get_job(&job_id).await?])
            }
            None => Ok(jobs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const JOBS_PATH: &str = "/v1/projects/proj/regions/us-central1/jobs";

    fn repository(server: &MockServer) -> HttpJobRepository {
        HttpJobRepository::new(Arc::new(JobServiceClient::new(
            server.base_url(),
            "proj",
            "us-central1",
        )))
    }

    fn job_body(job_id: &str, key: &RequestKey) -> serde_json::Value {
        json!({
            "reference": { "projectId": "proj", "jobId": job_id },
            "placement": { "clusterName": "c1" },
            "labels": { "sparkstep-request-key": key.as_str() },
            "sparkJob": { "mainClass": "Main" },
            "status": { "state": "PENDING" }
        })
    }

    #[tokio::test]
    async fn test_created_job_found_while_listing_lags() {
        let server = MockServer::start();
        let key = RequestKey::from_token("run-1/spark");
        let submit = server.mock(|when, then| {
            when.method(POST).path(format!("{JOBS_PATH}:submit"));
            then.status(200).json_body(job_body("job-1", &key));
        });
        let list = server.mock(|when, then| {
            when.method(GET).path(JOBS_PATH);
            then.status(200).json_body(json!({}));
        });
        let get = server.mock(|when, then| {
            when.method(GET).path(format!("{JOBS_PATH}/job-1"));
            then.status(200).json_body(job_body("job-1", &key));
        });
        let repo = repository(&server);

        repo.submit(&SubmitJobRequest {
            job: job_body("job-1", &key),
            request_id: key.to_string(),
        })
        .await
        .unwrap();
        let found = repo.find_by_key("c1", &key).await.unwrap();

        submit.assert();
        list.assert();
        get.assert();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference.job_id, "job-1");
    }

    #[tokio::test]
    async fn test_unknown_key_with_empty_listing_finds_nothing() {
        let server = MockServer::start();
        let key = RequestKey::from_token("never-submitted");
        let list = server.mock(|when, then| {
            when.method(GET).path(JOBS_PATH);
            then.status(200).json_body(json!({ "jobs": [] }));
        });
        let get = server.mock(|when, then| {
            when.method(GET).path_contains("/jobs/");
            then.status(200);
        });

        let found = repository(&server).find_by_key("c1", &key).await.unwrap();

        list.assert();
        get.assert_hits(0);
        assert!(found.is_empty());
    }
}
