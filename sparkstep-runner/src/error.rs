//! Step error taxonomy
//!
//! Caller errors fail fast, transport errors are retried before they surface,
//! and job-level outcomes are passed through exactly as the remote reported
//! them.

use sparkstep_core::SpecError;
use sparkstep_core::domain::outcome::{CancelOrigin, FailureReason, JobHandle, JobOutcome};
use thiserror::Error;

/// Exit code for cancelled steps
pub const EXIT_CODE_CANCELLED: u8 = 80;

#[derive(Debug, Error)]
pub enum StepError {
    /// The job spec is unusable; never retried
    #[error("invalid job spec: {0}")]
    InvalidSpec(String),

    /// Runner configuration is unusable; never retried
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The remote system refused the job definition
    #[error("submission rejected (status {status}): {detail}")]
    SubmissionRejected { status: u16, detail: String },

    /// Create kept failing at the transport level
    #[error("submission failed after {attempts} attempt(s): {last_error}")]
    TransientSubmissionFailure { attempts: u32, last_error: String },

    /// Status could not be observed; the job itself may still be running
    #[error("monitoring unavailable for job {job_id}: {detail}")]
    MonitoringUnavailable { job_id: String, detail: String },

    /// The remote system reported the job as failed
    #[error("job {job_id} failed: {detail}")]
    JobFailed { job_id: String, detail: String },

    /// The job was cancelled, by the remote system or by us
    #[error("job {job_id} cancelled ({origin})")]
    JobCancelled { job_id: String, origin: CancelOrigin },
}

impl StepError {
    /// Process exit code reported to the orchestrator
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::JobFailed { .. } | Self::MonitoringUnavailable { .. } => 1,
            Self::InvalidSpec(_) | Self::InvalidConfig(_) => 2,
            Self::SubmissionRejected { .. } | Self::TransientSubmissionFailure { .. } => 3,
            Self::JobCancelled { .. } => EXIT_CODE_CANCELLED,
        }
    }
}

impl From<SpecError> for StepError {
    fn from(err: SpecError) -> Self {
        Self::InvalidSpec(err.to_string())
    }
}

/// Maps a terminal outcome onto the taxonomy; success yields the handle
pub fn outcome_into_result(outcome: JobOutcome) -> Result<JobHandle, StepError> {
    match outcome {
        JobOutcome::Succeeded { handle } => Ok(handle),
        JobOutcome::Failed {
            handle,
            reason: FailureReason::Remote(detail),
        } => Err(StepError::JobFailed {
            job_id: handle.job_id,
            detail,
        }),
        JobOutcome::Failed {
            handle,
            reason: FailureReason::MonitoringUnavailable(detail),
        } => Err(StepError::MonitoringUnavailable {
            job_id: handle.job_id,
            detail,
        }),
        JobOutcome::Cancelled { handle, origin } => Err(StepError::JobCancelled {
            job_id: handle.job_id,
            origin,
        }),
    }
}
