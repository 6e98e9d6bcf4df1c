//! Runner configuration
//!
//! Defines all configurable parameters for the step: the job service
//! endpoint, polling cadence, cancellation grace and submission retry budget.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::StepError;

pub const DEFAULT_ENDPOINT: &str = "https://dataproc.googleapis.com";
pub const DEFAULT_WAIT_INTERVAL_SECS: i64 = 30;
pub const DEFAULT_CANCEL_GRACE_SECS: u64 = 30;
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_SUBMIT_ATTEMPTS: u32 = 4;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_JOB_ID_OUTPUT_PATH: &str = "/tmp/kfp/output/dataproc/job_id.txt";

/// Polling cadence of the job monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between two status queries
    pub wait_interval: Duration,

    /// How long to wait for the remote side to confirm a cancellation
    pub cancel_grace_period: Duration,

    /// Consecutive failed status queries tolerated before giving up
    pub failure_threshold: u32,
}

impl PollConfig {
    /// Creates a poll configuration; `wait_interval_secs` must be positive
    pub fn new(wait_interval_secs: i64) -> Result<Self, StepError> {
        if wait_interval_secs <= 0 {
            return Err(StepError::InvalidConfig(format!(
                "wait_interval must be greater than 0, got {wait_interval_secs}"
            )));
        }
        Ok(Self {
            wait_interval: Duration::from_secs(wait_interval_secs.unsigned_abs()),
            cancel_grace_period: Duration::from_secs(DEFAULT_CANCEL_GRACE_SECS),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        })
    }

    pub fn with_cancel_grace_period(mut self, grace: Duration) -> Self {
        self.cancel_grace_period = grace;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), StepError> {
        if self.wait_interval.is_zero() {
            return Err(StepError::InvalidConfig(
                "wait_interval must be greater than 0".to_string(),
            ));
        }
        if self.failure_threshold == 0 {
            return Err(StepError::InvalidConfig(
                "failure_threshold must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            wait_interval: Duration::from_secs(DEFAULT_WAIT_INTERVAL_SECS.unsigned_abs()),
            cancel_grace_period: Duration::from_secs(DEFAULT_CANCEL_GRACE_SECS),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

/// Bounded exponential backoff for transport failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_SUBMIT_ATTEMPTS,
            initial_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Job service base URL (e.g., "https://dataproc.googleapis.com")
    pub endpoint: String,

    /// Already-issued bearer token, if the endpoint needs one
    pub access_token: Option<String>,

    /// Where the job id is written on success
    pub job_id_output_path: PathBuf,

    /// Upper bound on a single HTTP request to the job service
    pub request_timeout: Duration,

    pub poll: PollConfig,

    pub retry: RetryPolicy,
}

impl RunnerConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), StepError> {
        if self.endpoint.is_empty() {
            return Err(StepError::InvalidConfig(
                "endpoint cannot be empty".to_string(),
            ));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(StepError::InvalidConfig(
                "endpoint must start with http:// or https://".to_string(),
            ));
        }

        if self.job_id_output_path.as_os_str().is_empty() {
            return Err(StepError::InvalidConfig(
                "job_id_output_path cannot be empty".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(StepError::InvalidConfig(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(StepError::InvalidConfig(
                "submit attempts must be greater than 0".to_string(),
            ));
        }

        self.poll.validate()
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            job_id_output_path: PathBuf::from(DEFAULT_JOB_ID_OUTPUT_PATH),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll: PollConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.poll.wait_interval, Duration::from_secs(30));
        assert_eq!(config.poll.cancel_grace_period, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_wait_interval_rejected() {
        assert!(matches!(PollConfig::new(0), Err(StepError::InvalidConfig(_))));
        assert!(matches!(PollConfig::new(-5), Err(StepError::InvalidConfig(_))));
        assert_eq!(
            PollConfig::new(30).unwrap().wait_interval,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::default();

        config.endpoint = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.endpoint = "http://localhost:8080".to_string();
        assert!(config.validate().is_ok());

        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.request_timeout = Duration::from_secs(10);
        config.poll.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(10), Duration::from_secs(30));
        assert_eq!(policy.delay_after(64), Duration::from_secs(30));
    }
}
