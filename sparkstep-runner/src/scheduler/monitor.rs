//! Job monitor
//!
//! Polls the remote job status every `wait_interval` until the job is done,
//! failed or cancelled. Every status query and every sleep races the cancel
//! signal; once cancelling, every remote call is bounded by the grace
//! deadline.

use std::future::Future;
use std::sync::Arc;

use sparkstep_core::domain::job::{JobState, RemoteJob};
use sparkstep_core::domain::outcome::{CancelOrigin, FailureReason, JobHandle, JobOutcome};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelSignal;
use crate::clock::Clock;
use crate::config::PollConfig;
use crate::repository::JobRepository;

/// Watches one job at a time until it is terminal
pub struct JobMonitor {
    repository: Arc<dyn JobRepository>,
    clock: Arc<dyn Clock>,
}

impl JobMonitor {
    /// Creates a new job monitor
    pub fn new(repository: Arc<dyn JobRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Waits for the job behind `handle` to finish
    pub async fn wait(
        &self,
        handle: &JobHandle,
        config: &PollConfig,
        cancel: &mut CancelSignal,
    ) -> JobOutcome {
        info!(
            "Waiting for job {} (interval: {:?})",
            handle.job_id, config.wait_interval
        );

        let mut polls: u64 = 0;
        let mut failure_streak: u32 = 0;
        let mut last_state = None;

        loop {
            if cancel.is_cancelled() {
                return self.cancel_and_confirm(handle, config).await;
            }

            polls += 1;
            let queried = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.cancel_and_confirm(handle, config).await;
                }
                result = self.repository.get(&handle.job_id) => result,
            };
            match queried {
                Ok(job) => {
                    failure_streak = 0;
                    let state = job.status.state;
                    if last_state != Some(state) {
                        info!("Job {} is {}", handle.job_id, state);
                        last_state = Some(state);
                    } else {
                        debug!("Job {} still {} (poll {})", handle.job_id, state, polls);
                    }

                    if let Some(outcome) = classify(handle, &job, CancelOrigin::Remote) {
                        info!("Job {} finished after {} poll(s)", handle.job_id, polls);
                        return outcome;
                    }
                }
                Err(e) => {
                    failure_streak += 1;
                    warn!(
                        "Failed to query job {} ({}/{}): {}",
                        handle.job_id, failure_streak, config.failure_threshold, e
                    );
                    if failure_streak >= config.failure_threshold {
                        error!(
                            "Giving up on job {} after {} consecutive failed queries",
                            handle.job_id, failure_streak
                        );
                        return JobOutcome::Failed {
                            handle: handle.clone(),
                            reason: FailureReason::MonitoringUnavailable(format!(
                                "{} consecutive status queries failed, last error: {}",
                                failure_streak, e
                            )),
                        };
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.cancel_and_confirm(handle, config).await;
                }
                _ = self.clock.sleep(config.wait_interval) => {}
            }
        }
    }

    /// Asks the remote side to cancel, then waits up to the grace period for
    /// it to confirm. Local cancellation wins if it never does.
    async fn cancel_and_confirm(&self, handle: &JobHandle, config: &PollConfig) -> JobOutcome {
        info!("Cancellation requested, cancelling job {}", handle.job_id);
        let deadline = self.clock.now() + config.cancel_grace_period;

        match self
            .before(deadline, self.repository.cancel(&handle.job_id))
            .await
        {
            Some(Ok(job)) => {
                if let Some(outcome) = classify(handle, &job, CancelOrigin::Local) {
                    return outcome;
                }
                debug!("Job {} is {} after cancel", handle.job_id, job.status.state);
            }
            Some(Err(e)) => warn!("Failed to cancel job {}: {}", handle.job_id, e),
            None => warn!("Cancel request for job {} did not return in time", handle.job_id),
        }

        loop {
            let now = self.clock.now();
            if now >= deadline {
                warn!(
                    "Job {} did not confirm cancellation within {:?}",
                    handle.job_id, config.cancel_grace_period
                );
                return JobOutcome::Cancelled {
                    handle: handle.clone(),
                    origin: CancelOrigin::Local,
                };
            }

            self.clock
                .sleep(config.wait_interval.min(deadline - now))
                .await;

            match self
                .before(deadline, self.repository.get(&handle.job_id))
                .await
            {
                Some(Ok(job)) => {
                    if let Some(outcome) = classify(handle, &job, CancelOrigin::Local) {
                        return outcome;
                    }
                    debug!("Job {} is {}", handle.job_id, job.status.state);
                }
                Some(Err(e)) => warn!("Failed to query job {}: {}", handle.job_id, e),
                None => debug!("Status query for job {} ran into the deadline", handle.job_id),
            }
        }
    }

    /// Resolves `call`, or gives up with `None` once `deadline` has passed
    async fn before<T>(&self, deadline: Instant, call: impl Future<Output = T>) -> Option<T> {
        let remaining = deadline.saturating_duration_since(self.clock.now());
        tokio::select! {
            biased;
            result = call => Some(result),
            _ = self.clock.sleep(remaining) => None,
        }
    }
}

/// Terminal outcome for `job`, or `None` while it is still in flight
fn classify(handle: &JobHandle, job: &RemoteJob, cancel_origin: CancelOrigin) -> Option<JobOutcome> {
    let handle = handle.clone();
    match job.status.state {
        JobState::Done => Some(JobOutcome::Succeeded { handle }),
        JobState::Error => Some(JobOutcome::Failed {
            handle,
            reason: FailureReason::Remote(job.status.details.clone().unwrap_or_default()),
        }),
        JobState::Cancelled => Some(JobOutcome::Cancelled {
            handle,
            origin: cancel_origin,
        }),
        _ => None,
    }
}
