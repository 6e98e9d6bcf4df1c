//! Job handles and terminal outcomes

use serde::{Deserialize, Serialize};

/// Identifier of an accepted remote job
///
/// Created once by the submitter and never modified; `job_id` is the only
/// value surfaced to downstream steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub project_id: String,
    pub region: String,
    pub job_id: String,
}

impl JobHandle {
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        job_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            region: region.into(),
            job_id: job_id.into(),
        }
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.project_id, self.region, self.job_id)
    }
}

/// Why a job ended in failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The remote system reported the job as failed, detail verbatim
    Remote(String),
    /// Status could not be observed; the true job state is unknown
    MonitoringUnavailable(String),
}

/// Who ended a cancelled job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOrigin {
    /// Cancelled by the remote system or by someone else
    Remote,
    /// Cancelled because the caller signalled cancellation
    Local,
}

impl std::fmt::Display for CancelOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => f.write_str("remote"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// Terminal classification of a monitored job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Succeeded {
        handle: JobHandle,
    },
    Failed {
        handle: JobHandle,
        reason: FailureReason,
    },
    Cancelled {
        handle: JobHandle,
        origin: CancelOrigin,
    },
}

impl JobOutcome {
    pub fn handle(&self) -> &JobHandle {
        match self {
            Self::Succeeded { handle }
            | Self::Failed { handle, .. }
            | Self::Cancelled { handle, .. } => handle,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.handle().job_id
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}
