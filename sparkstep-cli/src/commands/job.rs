//! Job command handlers
//!
//! Handles listing, inspecting and cancelling jobs on the remote service.

use anyhow::{Context, Result, bail};
use clap::{Subcommand, ValueEnum};
use colored::*;
use sparkstep_client::JobServiceClient;
use sparkstep_core::domain::job::{JobState, RemoteJob};
use sparkstep_core::dto::job::{JobStateMatcher, ListJobsQuery};

use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// List jobs
    List {
        /// Only jobs on this cluster
        #[arg(long)]
        cluster: Option<String>,

        /// Filter by lifecycle
        #[arg(long, value_enum, default_value_t = StateFilter::All)]
        state: StateFilter,
    },
    /// Get job details
    Get {
        /// Job ID
        id: String,
    },
    /// Request cancellation of a job
    Cancel {
        /// Job ID
        id: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StateFilter {
    All,
    Active,
    NonActive,
}

impl From<StateFilter> for JobStateMatcher {
    fn from(filter: StateFilter) -> Self {
        match filter {
            StateFilter::All => JobStateMatcher::All,
            StateFilter::Active => JobStateMatcher::Active,
            StateFilter::NonActive => JobStateMatcher::NonActive,
        }
    }
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        JobCommands::List { cluster, state } => list_jobs(&client, cluster, state).await,
        JobCommands::Get { id } => get_job(&client, &id).await,
        JobCommands::Cancel { id } => cancel_job(&client, &id).await,
    }
}

/// List jobs
async fn list_jobs(
    client: &JobServiceClient,
    cluster: Option<String>,
    state: StateFilter,
) -> Result<()> {
    let query = ListJobsQuery {
        cluster_name: cluster,
        job_state_matcher: Some(state.into()),
        ..Default::default()
    };
    let jobs = client
        .list_all_jobs(&query)
        .await
        .context("Failed to list jobs")?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Get and display a single job
async fn get_job(client: &JobServiceClient, id: &str) -> Result<()> {
    let job = match client.get_job(id).await {
        Ok(job) => job,
        Err(e) if e.is_not_found() => bail!(
            "Job {} not found in {}/{}",
            id,
            client.project_id(),
            client.region()
        ),
        Err(e) => return Err(e).with_context(|| format!("Failed to get job {}", id)),
    };

    print_job_details(&job);

    Ok(())
}

/// Cancel a job and show the state the service reports back
async fn cancel_job(client: &JobServiceClient, id: &str) -> Result<()> {
    let job = match client.cancel_job(id).await {
        Ok(job) => job,
        Err(e) if e.is_not_found() => bail!("Job {} not found", id),
        Err(e) if e.is_client_error() => {
            bail!("Job {} cannot be cancelled: {}", id, e.detail())
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to cancel job {}", id)),
    };

    println!(
        "{} Cancellation requested for job {} (now {})",
        "✓".green(),
        job.reference.job_id.cyan(),
        colorize_state(job.status.state)
    );

    Ok(())
}

/// Print a job summary
fn print_job_summary(job: &RemoteJob) {
    println!("  {} Job {}", "▸".cyan(), job.reference.job_id.dimmed());
    println!("    Cluster:  {}", job.placement.cluster_name.dimmed());
    println!("    State:    {}", colorize_state(job.status.state));
    if let Some(started) = job.status.state_start_time {
        println!(
            "    Since:    {}",
            started.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
}

/// Print detailed job information
fn print_job_details(job: &RemoteJob) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.reference.job_id.cyan());
    println!("  Project:     {}", job.reference.project_id.dimmed());
    println!("  Cluster:     {}", job.placement.cluster_name);
    println!("  State:       {}", colorize_state(job.status.state));

    if let Some(started) = job.status.state_start_time {
        println!("  Since:       {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(details) = &job.status.details {
        println!("  Details:     {}", details.red());
    }

    if let Some(uri) = &job.driver_output_resource_uri {
        println!("  Driver log:  {}", uri);
    }

    if !job.labels.is_empty() {
        println!("\n{}", "Labels:".bold());
        for (key, value) in &job.labels {
            println!("  {} = {}", key.cyan(), value);
        }
    }

    if !job.status_history.is_empty() {
        println!("\n{}", "History:".bold());
        for status in &job.status_history {
            let at = status
                .state_start_time
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_default();
            println!("  {} {}", at.dimmed(), colorize_state(status.state));
        }
    }

    if !job.payload.is_empty() {
        println!("\n{}", "Payload:".bold());
        match serde_json::to_string_pretty(&job.payload) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{:?}", job.payload),
        }
    }
}

/// Colorize job state for display
fn colorize_state(state: JobState) -> colored::ColoredString {
    let state_str = state.to_string();
    match state {
        JobState::Pending | JobState::SetupDone => state_str.yellow(),
        JobState::Running => state_str.cyan(),
        JobState::Done => state_str.green(),
        JobState::Error | JobState::AttemptFailure => state_str.red(),
        JobState::CancelPending | JobState::CancelStarted | JobState::Cancelled => {
            state_str.dimmed()
        }
        JobState::StateUnspecified => state_str.normal(),
    }
}
