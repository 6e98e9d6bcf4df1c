//! Job submitter
//!
//! Handles creating the remote job for a spec:
//! - Building and validating the job document
//! - Deriving the idempotency key and reusing an existing job for it
//! - Submitting with bounded exponential backoff on transport failures

use std::future::Future;
use std::sync::Arc;

use sparkstep_client::ClientError;
use sparkstep_core::domain::job::{JobState, RemoteJob};
use sparkstep_core::domain::key::RequestKey;
use sparkstep_core::domain::kind::JobKind;
use sparkstep_core::domain::outcome::JobHandle;
use sparkstep_core::domain::spec::JobSpec;
use sparkstep_core::dto::job::SubmitJobRequest;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::RetryPolicy;
use crate::error::StepError;
use crate::repository::JobRepository;

/// Creates remote jobs, at most one per idempotency key
pub struct Submitter {
    repository: Arc<dyn JobRepository>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

/// Last error of a retried call and how many attempts were made
struct Exhausted {
    error: ClientError,
    attempts: u32,
}

impl Submitter {
    pub fn new(repository: Arc<dyn JobRepository>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            repository,
            clock,
            retry,
        }
    }

    /// Submits `spec`, or returns the handle of the job an earlier submission
    /// of the same spec created
    pub async fn submit<K: JobKind>(&self, spec: &JobSpec<K>) -> Result<JobHandle, StepError> {
        let document = spec.build_document()?;
        let key = spec.request_key(&document)?;
        let cluster = document.cluster_name().to_string();
        let pinned = document.pinned_job_id().map(str::to_string);

        info!(
            "Submitting {} job to cluster {} (request key {})",
            spec.kind.field(),
            cluster,
            key
        );

        if let Some(existing) = self.find_existing(&cluster, &key).await? {
            info!(
                "Reusing job {} ({}) from an earlier submission",
                existing.reference.job_id, existing.status.state
            );
            return Ok(handle_for(spec, existing));
        }

        // Fixed across attempts so a create whose response was lost is
        // deduplicated remotely.
        let job_id = pinned
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let request = SubmitJobRequest {
            job: document.into_submission(&job_id, &key),
            request_id: key.to_string(),
        };

        match self
            .with_retry("submit job", || self.repository.submit(&request))
            .await
        {
            Ok(job) => {
                info!("Submitted job {}", job.reference.job_id);
                Ok(handle_for(spec, job))
            }
            Err(Exhausted { error, .. }) if error.is_conflict() => {
                self.resolve_conflict(spec, &cluster, &key, pinned.as_deref(), error)
                    .await
            }
            Err(Exhausted { error, attempts }) if error.is_transient() => {
                Err(StepError::TransientSubmissionFailure {
                    attempts,
                    last_error: error.to_string(),
                })
            }
            Err(Exhausted { error, .. }) => Err(rejected(error)),
        }
    }

    /// Newest job for `key` that has not been superseded by a cancellation
    async fn find_existing(
        &self,
        cluster: &str,
        key: &RequestKey,
    ) -> Result<Option<RemoteJob>, StepError> {
        let jobs = self
            .with_retry("look up existing job", || {
                self.repository.find_by_key(cluster, key)
            })
            .await
            .map_err(|Exhausted { error, attempts }| {
                if error.is_transient() {
                    StepError::TransientSubmissionFailure {
                        attempts,
                        last_error: error.to_string(),
                    }
                } else {
                    rejected(error)
                }
            })?;

        let superseded = jobs
            .iter()
            .filter(|job| job.status.state == JobState::Cancelled)
            .count();
        if superseded > 0 {
            debug!("Ignoring {} cancelled job(s) for key {}", superseded, key);
        }

        Ok(jobs
            .into_iter()
            .filter(|job| job.request_key() == Some(key.as_str()))
            .filter(|job| job.status.state != JobState::Cancelled)
            .max_by_key(submitted_at))
    }

    /// A 409 on create means the job exists already: either an earlier
    /// attempt created it, or a pinned job id is taken by someone else
    async fn resolve_conflict<K: JobKind>(
        &self,
        spec: &JobSpec<K>,
        cluster: &str,
        key: &RequestKey,
        pinned: Option<&str>,
        error: ClientError,
    ) -> Result<JobHandle, StepError> {
        if let Some(existing) = self.find_existing(cluster, key).await? {
            info!(
                "Job {} already exists for this submission",
                existing.reference.job_id
            );
            return Ok(handle_for(spec, existing));
        }

        if let Some(job_id) = pinned
            && let Ok(job) = self
                .with_retry("fetch pinned job", || self.repository.get(job_id))
                .await
            && job.request_key() == Some(key.as_str())
        {
            if job.status.state == JobState::Cancelled {
                return Err(StepError::SubmissionRejected {
                    status: error.status().unwrap_or(409),
                    detail: format!(
                        "job id {job_id} belongs to a cancelled job and cannot be reused"
                    ),
                });
            }
            return Ok(handle_for(spec, job));
        }

        Err(rejected(error))
    }

    /// Runs `call` until it succeeds, fails definitively, or the retry
    /// budget is spent
    async fn with_retry<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, Exhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("Managed to {} after {} attempt(s)", what, attempt);
                    }
                    return Ok(value);
                }
                Err(error) if error.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "Failed to {} (attempt {}/{}): {}",
                        what, attempt, self.retry.max_attempts, error
                    );
                    warn!("Retrying in {} ms...", delay.as_millis());
                    self.clock.sleep(delay).await;
                }
                Err(error) => {
                    return Err(Exhausted {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

fn handle_for<K>(spec: &JobSpec<K>, job: RemoteJob) -> JobHandle {
    JobHandle::new(&spec.project_id, &spec.region, job.reference.job_id)
}

fn submitted_at(job: &RemoteJob) -> Option<chrono::DateTime<chrono::Utc>> {
    job.status_history
        .first()
        .and_then(|status| status.state_start_time)
        .or(job.status.state_start_time)
}

fn rejected(error: ClientError) -> StepError {
    StepError::SubmissionRejected {
        status: error.status().unwrap_or_default(),
        detail: error.detail(),
    }
}
