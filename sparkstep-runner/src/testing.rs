//! In-memory fakes for the repository and clock

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sparkstep_client::ClientError;
use sparkstep_core::domain::job::{JobReference, JobState, JobStatus, RemoteJob};
use sparkstep_core::domain::key::RequestKey;
use sparkstep_core::dto::job::SubmitJobRequest;
use tokio::time::{Duration, Instant};

use crate::cancel::CancelHandle;
use crate::clock::Clock;
use crate::repository::JobRepository;

/// What the next submit call does
#[derive(Debug, Clone)]
pub enum SubmitStep {
    /// Create the job (or return the one already created for the request id)
    Accept,
    /// Create the job, then fail the call as if the response was lost
    AcceptThenFail(u16),
    /// Fail without creating anything
    Fail(u16, String),
}

/// What a status query returns
#[derive(Debug, Clone)]
pub enum StatusStep {
    State(JobState),
    StateWithDetails(JobState, String),
    Unavailable,
}

#[derive(Default)]
struct FakeState {
    jobs: Vec<RemoteJob>,
    by_request_id: HashMap<String, String>,
    submit_steps: VecDeque<SubmitStep>,
    status_steps: VecDeque<StatusStep>,
    last_status: Option<StatusStep>,
    after_cancel: Option<JobState>,
    cancel_on_poll: Option<(usize, CancelHandle)>,
    submit_calls: usize,
    get_calls: usize,
    cancel_calls: usize,
    find_calls: usize,
}

/// Scriptable stand-in for the remote job API
#[derive(Default)]
pub struct FakeRepository {
    state: Mutex<FakeState>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit behaviour per call; calls beyond the script accept
    pub fn with_submit_steps(self, steps: impl IntoIterator<Item = SubmitStep>) -> Self {
        self.state.lock().unwrap().submit_steps = steps.into_iter().collect();
        self
    }

    /// Status per query; the last step repeats. Unscripted queries report
    /// the stored state
    pub fn with_status_steps(self, steps: impl IntoIterator<Item = StatusStep>) -> Self {
        self.state.lock().unwrap().status_steps = steps.into_iter().collect();
        self
    }

    /// State reported by every query once cancel has been called
    pub fn acknowledging_cancel_with(self, state: JobState) -> Self {
        self.state.lock().unwrap().after_cancel = Some(state);
        self
    }

    /// Fire `handle` while serving the `poll`-th status query (1-based)
    pub fn cancelling_on_poll(self, poll: usize, handle: CancelHandle) -> Self {
        self.state.lock().unwrap().cancel_on_poll = Some((poll, handle));
        self
    }

    /// Pre-existing remote job
    pub fn with_job(self, job: RemoteJob) -> Self {
        self.state.lock().unwrap().jobs.push(job);
        self
    }

    pub fn jobs(&self) -> Vec<RemoteJob> {
        self.state.lock().unwrap().jobs.clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.state.lock().unwrap().submit_calls
    }

    pub fn get_calls(&self) -> usize {
        self.state.lock().unwrap().get_calls
    }

    pub fn cancel_calls(&self) -> usize {
        self.state.lock().unwrap().cancel_calls
    }

    pub fn find_calls(&self) -> usize {
        self.state.lock().unwrap().find_calls
    }
}

/// Remote job as the fake stores it
pub fn remote_job(job_id: &str, key: Option<&RequestKey>, state: JobState) -> RemoteJob {
    let mut labels = std::collections::BTreeMap::new();
    if let Some(key) = key {
        labels.insert(
            sparkstep_core::domain::job::REQUEST_KEY_LABEL.to_string(),
            key.to_string(),
        );
    }
    RemoteJob {
        reference: JobReference {
            project_id: "proj".to_string(),
            job_id: job_id.to_string(),
        },
        placement: sparkstep_core::domain::job::JobPlacement {
            cluster_name: "c1".to_string(),
            cluster_uuid: None,
        },
        labels,
        status: JobStatus {
            state,
            details: None,
            state_start_time: None,
        },
        status_history: Vec::new(),
        driver_output_resource_uri: None,
        payload: serde_json::Map::new(),
    }
}

fn unavailable() -> ClientError {
    ClientError::api_error(503, "service unavailable")
}

#[async_trait]
impl JobRepository for FakeRepository {
    async fn submit(&self, request: &SubmitJobRequest) -> Result<RemoteJob, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.submit_calls += 1;
        let step = state.submit_steps.pop_front().unwrap_or(SubmitStep::Accept);

        if let SubmitStep::Fail(status, message) = step {
            return Err(ClientError::api_error(status, message));
        }

        let existing = state
            .by_request_id
            .get(&request.request_id)
            .and_then(|id| state.jobs.iter().find(|j| &j.reference.job_id == id))
            .cloned();
        let job = match existing {
            Some(job) => job,
            None => {
                let mut job: RemoteJob =
                    serde_json::from_value(request.job.clone()).expect("submitted document");
                job.status.state = JobState::Pending;
                if state
                    .jobs
                    .iter()
                    .any(|j| j.reference.job_id == job.reference.job_id)
                {
                    return Err(ClientError::api_error(409, "job id already exists"));
                }
                state
                    .by_request_id
                    .insert(request.request_id.clone(), job.reference.job_id.clone());
                state.jobs.push(job.clone());
                job
            }
        };

        match step {
            SubmitStep::AcceptThenFail(status) => {
                Err(ClientError::api_error(status, "response lost"))
            }
            _ => Ok(job),
        }
    }

    async fn get(&self, job_id: &str) -> Result<RemoteJob, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.get_calls += 1;

        if let Some((poll, handle)) = &state.cancel_on_poll
            && *poll == state.get_calls
        {
            handle.cancel();
        }

        let step = if state.cancel_calls > 0
            && let Some(after) = state.after_cancel
        {
            Some(StatusStep::State(after))
        } else {
            match state.status_steps.pop_front() {
                Some(step) => {
                    state.last_status = Some(step.clone());
                    Some(step)
                }
                None => state.last_status.clone(),
            }
        };

        let mut job = state
            .jobs
            .iter()
            .find(|j| j.reference.job_id == job_id)
            .cloned()
            .unwrap_or_else(|| remote_job(job_id, None, JobState::Pending));
        match step {
            Some(StatusStep::State(s)) => job.status.state = s,
            Some(StatusStep::StateWithDetails(s, details)) => {
                job.status.state = s;
                job.status.details = Some(details);
            }
            Some(StatusStep::Unavailable) => return Err(unavailable()),
            None => {}
        }
        Ok(job)
    }

    async fn cancel(&self, job_id: &str) -> Result<RemoteJob, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.cancel_calls += 1;
        Ok(remote_job(job_id, None, JobState::CancelPending))
    }

    async fn find_by_key(
        &self,
        cluster_name: &str,
        key: &RequestKey,
    ) -> Result<Vec<RemoteJob>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.find_calls += 1;
        Ok(state
            .jobs
            .iter()
            .filter(|j| j.placement.cluster_name == cluster_name)
            .filter(|j| j.request_key() == Some(key.as_str()))
            .cloned()
            .collect())
    }
}

/// Remote API whose calls never return, like a service that stopped
/// answering mid-request
#[derive(Default)]
pub struct HangingRepository {
    get_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl HangingRepository {
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobRepository for HangingRepository {
    async fn submit(&self, _request: &SubmitJobRequest) -> Result<RemoteJob, ClientError> {
        std::future::pending().await
    }

    async fn get(&self, _job_id: &str) -> Result<RemoteJob, ClientError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn cancel(&self, _job_id: &str) -> Result<RemoteJob, ClientError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn find_by_key(
        &self,
        _cluster_name: &str,
        _key: &RequestKey,
    ) -> Result<Vec<RemoteJob>, ClientError> {
        std::future::pending().await
    }
}

/// Clock whose sleeps return immediately and advance virtual time
pub struct FakeClock {
    start: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        *self.elapsed.lock().unwrap() += duration;
        tokio::task::yield_now().await;
    }
}
