//! Sparkstep Runner
//!
//! A pipeline step that submits one job to a managed Spark-on-YARN service
//! and waits for it to finish.
//!
//! Architecture:
//! - Configuration: command-line flags with environment fallbacks
//! - Repository: HTTP communication with the remote job API
//! - Service: idempotent job submission
//! - Scheduler: status polling, cancellation and outcome classification
//!
//! On success the job id is written for downstream steps; the exit code
//! tells the orchestrator whether the job failed, was rejected or was
//! cancelled.

mod args;
mod cancel;
mod clock;
mod config;
mod error;
mod output;
mod repository;
mod scheduler;
mod service;
#[cfg(test)]
mod testing;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sparkstep_client::JobServiceClient;
use sparkstep_core::domain::kind::JobKind;
use sparkstep_core::domain::spec::JobSpec;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::{Args, KindArgs};
use crate::cancel::{CancelSignal, cancel_pair, spawn_signal_listener};
use crate::clock::{Clock, TokioClock};
use crate::config::RunnerConfig;
use crate::error::{StepError, outcome_into_result};
use crate::repository::{HttpJobRepository, JobRepository};
use crate::scheduler::JobMonitor;
use crate::service::Submitter;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sparkstep_runner=info,sparkstep_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<StepError>()
                .map(StepError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting Sparkstep Runner");

    let config = args.runner_config()?;
    info!(
        "Loaded configuration: endpoint={}, project={}, region={}, cluster={}",
        config.endpoint, args.project_id, args.region, args.cluster_name
    );

    let (cancel_handle, cancel_signal) = cancel_pair();
    let _signal_listener = spawn_signal_listener(cancel_handle);

    let job_id = match &args.kind {
        KindArgs::Spark(jvm) => {
            run_step(args.job_spec(jvm.spark_job()?)?, &config, cancel_signal).await?
        }
        KindArgs::Pyspark(py) => {
            run_step(args.job_spec(py.pyspark_job()?)?, &config, cancel_signal).await?
        }
        KindArgs::Hadoop(jvm) => {
            run_step(args.job_spec(jvm.hadoop_job()?)?, &config, cancel_signal).await?
        }
    };

    output::write_job_id(&config.job_id_output_path, &job_id)
        .await
        .context("Failed to record job id")?;
    println!("{}", job_id);

    Ok(())
}

/// Submits `spec` and waits for the job; returns the job id on success
async fn run_step<K: JobKind>(
    spec: JobSpec<K>,
    config: &RunnerConfig,
    mut cancel: CancelSignal,
) -> Result<String, StepError> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| StepError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
    let mut client =
        JobServiceClient::with_client(&config.endpoint, &spec.project_id, &spec.region, http);
    if let Some(token) = &config.access_token {
        client = client.with_access_token(token);
    }

    let repository: Arc<dyn JobRepository> = Arc::new(HttpJobRepository::new(Arc::new(client)));
    let clock: Arc<dyn Clock> = Arc::new(TokioClock);

    let submitter = Submitter::new(Arc::clone(&repository), Arc::clone(&clock), config.retry.clone());
    let monitor = JobMonitor::new(repository, clock);

    let handle = submitter.submit(&spec).await?;
    info!("Job handle: {}", handle);

    let outcome = monitor.wait(&handle, &config.poll, &mut cancel).await;
    let handle = outcome_into_result(outcome)?;

    info!("Job {} succeeded", handle.job_id);
    Ok(handle.job_id)
}
