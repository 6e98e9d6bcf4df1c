//! Remote job domain types
//!
//! Mirrors the job resource returned by the remote job API. Only the fields
//! this workspace reads are typed; the job-kind payload is kept as raw JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label carrying the idempotency key of the submission that created a job
pub const REQUEST_KEY_LABEL: &str = "sparkstep-request-key";

/// Job resource as returned by the remote job API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteJob {
    pub reference: JobReference,
    #[serde(default)]
    pub placement: JobPlacement,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_history: Vec<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_output_resource_uri: Option<String>,
    /// Job-kind payload (`sparkJob`, `pysparkJob`, ...) and any other fields
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl RemoteJob {
    /// Value of the idempotency key label, if the job carries one
    pub fn request_key(&self) -> Option<&str> {
        self.labels.get(REQUEST_KEY_LABEL).map(String::as_str)
    }
}

/// Globally addressable job identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    #[serde(default)]
    pub project_id: String,
    pub job_id: String,
}

/// Where the job runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPlacement {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_uuid: Option<String>,
}

/// Observed job status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default)]
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_start_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Remote job state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    SetupDone,
    Running,
    CancelPending,
    CancelStarted,
    Cancelled,
    Done,
    Error,
    AttemptFailure,
    /// Also stands in for states this client does not know
    #[default]
    #[serde(other)]
    StateUnspecified,
}

impl JobState {
    /// States from which the remote system never transitions again
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }

    /// Wire name of the state, as used in list filters
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StateUnspecified => "STATE_UNSPECIFIED",
            Self::Pending => "PENDING",
            Self::SetupDone => "SETUP_DONE",
            Self::Running => "RUNNING",
            Self::CancelPending => "CANCEL_PENDING",
            Self::CancelStarted => "CANCEL_STARTED",
            Self::Cancelled => "CANCELLED",
            Self::Done => "DONE",
            Self::Error => "ERROR",
            Self::AttemptFailure => "ATTEMPT_FAILURE",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Error.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::CancelPending.is_terminal());
        assert!(!JobState::AttemptFailure.is_terminal());
    }

    #[test]
    fn test_unknown_state_is_unspecified() {
        let state: JobState = serde_json::from_value(json!("QUEUED_SOMEWHERE")).unwrap();
        assert_eq!(state, JobState::StateUnspecified);
    }

    #[test]
    fn test_state_wire_names() {
        let done: JobState = serde_json::from_value(json!("DONE")).unwrap();
        assert_eq!(done, JobState::Done);
        let unspecified: JobState = serde_json::from_value(json!("STATE_UNSPECIFIED")).unwrap();
        assert_eq!(unspecified, JobState::StateUnspecified);

        assert_eq!(serde_json::to_value(JobState::AttemptFailure).unwrap(), json!("ATTEMPT_FAILURE"));
        assert_eq!(serde_json::to_value(JobState::default()).unwrap(), json!("STATE_UNSPECIFIED"));
        assert_eq!(JobState::default().to_string(), "STATE_UNSPECIFIED");
    }

    #[test]
    fn test_parse_remote_job() {
        let job: RemoteJob = serde_json::from_value(json!({
            "reference": { "projectId": "p1", "jobId": "job-1" },
            "placement": { "clusterName": "c1" },
            "sparkJob": { "mainClass": "Main", "args": ["1000"] },
            "labels": { "sparkstep-request-key": "abc" },
            "status": {
                "state": "ERROR",
                "details": "Job failed with message [boom]",
                "stateStartTime": "2024-05-01T10:00:00Z"
            }
        }))
        .unwrap();

        assert_eq!(job.reference.job_id, "job-1");
        assert_eq!(job.placement.cluster_name, "c1");
        assert_eq!(job.status.state, JobState::Error);
        assert_eq!(
            job.status.details.as_deref(),
            Some("Job failed with message [boom]")
        );
        assert_eq!(job.request_key(), Some("abc"));
        assert_eq!(job.payload["sparkJob"]["mainClass"], "Main");
    }
}
