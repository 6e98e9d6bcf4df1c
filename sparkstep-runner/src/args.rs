//! Command-line arguments
//!
//! Mirrors the inputs of the pipeline component: identifiers, driver
//! parameters, optional JSON overrides and the poll interval. Every flag that
//! an orchestrator typically templates also reads from the environment.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use sparkstep_core::domain::kind::{HadoopJob, JobKind, PySparkJob, SparkJob};
use sparkstep_core::domain::spec::JobSpec;

use crate::config::{
    DEFAULT_CANCEL_GRACE_SECS, DEFAULT_ENDPOINT, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_JOB_ID_OUTPUT_PATH, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SUBMIT_ATTEMPTS,
    DEFAULT_WAIT_INTERVAL_SECS, PollConfig, RetryPolicy, RunnerConfig,
};
use crate::error::StepError;

#[derive(Parser, Debug)]
#[command(name = "sparkstep-runner")]
#[command(
    about = "Submit a job to a managed Spark-on-YARN service and wait for it to finish",
    long_about = None
)]
pub struct Args {
    /// Job service endpoint
    #[arg(long, env = "SPARKSTEP_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Bearer token for the job service
    #[arg(long, env = "SPARKSTEP_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, env = "SPARKSTEP_PROJECT_ID")]
    pub project_id: String,

    #[arg(long, env = "SPARKSTEP_REGION")]
    pub region: String,

    #[arg(long, env = "SPARKSTEP_CLUSTER_NAME")]
    pub cluster_name: String,

    /// Raw job document (JSON object); wins over the other flags, the job
    /// payload is merged into it
    #[arg(long)]
    pub job: Option<String>,

    /// JSON object merged into the job-kind payload
    #[arg(long)]
    pub job_payload: Option<String>,

    /// Job label, repeatable
    #[arg(long = "label", value_name = "KEY=VALUE")]
    pub labels: Vec<String>,

    /// Stable token identifying this logical submission across retries
    #[arg(long, env = "SPARKSTEP_CORRELATION_TOKEN")]
    pub correlation_token: Option<String>,

    /// Seconds between status checks
    #[arg(
        long,
        env = "SPARKSTEP_WAIT_INTERVAL",
        default_value_t = DEFAULT_WAIT_INTERVAL_SECS,
        allow_negative_numbers = true
    )]
    pub wait_interval: i64,

    /// Seconds to wait for the service to confirm a cancellation
    #[arg(long, env = "SPARKSTEP_CANCEL_GRACE_PERIOD", default_value_t = DEFAULT_CANCEL_GRACE_SECS)]
    pub cancel_grace_period: u64,

    /// Consecutive failed status checks before giving up
    #[arg(long, default_value_t = DEFAULT_FAILURE_THRESHOLD)]
    pub failure_threshold: u32,

    /// Attempts at creating the job when the service is unreachable
    #[arg(long, default_value_t = DEFAULT_SUBMIT_ATTEMPTS)]
    pub submit_attempts: u32,

    /// Seconds before a single request to the job service is abandoned
    #[arg(long, env = "SPARKSTEP_REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: u64,

    /// File receiving the job id on success
    #[arg(long, env = "SPARKSTEP_JOB_ID_OUTPUT_PATH", default_value = DEFAULT_JOB_ID_OUTPUT_PATH)]
    pub job_id_output_path: PathBuf,

    #[command(subcommand)]
    pub kind: KindArgs,
}

/// Job kind to submit
#[derive(Subcommand, Debug)]
pub enum KindArgs {
    /// Spark job with a JVM driver
    Spark(JvmArgs),
    /// PySpark job
    Pyspark(PySparkArgs),
    /// Hadoop MapReduce job
    Hadoop(JvmArgs),
}

#[derive(clap::Args, Debug)]
pub struct JvmArgs {
    /// URI of the jar holding the driver
    #[arg(long)]
    pub main_jar_file_uri: Option<String>,

    /// Driver main class
    #[arg(long)]
    pub main_class: Option<String>,

    #[command(flatten)]
    pub common: DriverArgs,
}

#[derive(clap::Args, Debug)]
pub struct PySparkArgs {
    /// URI of the python driver
    #[arg(long)]
    pub main_python_file_uri: String,

    #[arg(long, value_delimiter = ',')]
    pub python_file_uris: Vec<String>,

    #[command(flatten)]
    pub common: DriverArgs,
}

#[derive(clap::Args, Debug)]
pub struct DriverArgs {
    /// Driver arguments as a JSON list, e.g. '["1000"]'
    #[arg(long)]
    pub args: Option<String>,

    #[arg(long, value_delimiter = ',')]
    pub jar_file_uris: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    pub file_uris: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    pub archive_uris: Vec<String>,

    /// Job property, repeatable
    #[arg(long = "property", value_name = "KEY=VALUE")]
    pub properties: Vec<String>,
}

impl Args {
    /// Runner configuration; fails before any remote call when invalid
    pub fn runner_config(&self) -> Result<RunnerConfig, StepError> {
        let poll = PollConfig::new(self.wait_interval)?
            .with_cancel_grace_period(Duration::from_secs(self.cancel_grace_period))
            .with_failure_threshold(self.failure_threshold);

        let config = RunnerConfig {
            endpoint: self.endpoint.clone(),
            access_token: self.access_token.clone().filter(|t| !t.is_empty()),
            job_id_output_path: self.job_id_output_path.clone(),
            request_timeout: Duration::from_secs(self.request_timeout),
            poll,
            retry: RetryPolicy {
                max_attempts: self.submit_attempts,
                ..RetryPolicy::default()
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Wraps `kind` with the identifiers and overrides given on the command line
    pub fn job_spec<K: JobKind>(&self, kind: K) -> Result<JobSpec<K>, StepError> {
        let mut spec = JobSpec::new(&self.project_id, &self.region, &self.cluster_name, kind);

        if let Some(raw) = &self.job {
            spec = spec.with_raw_job(Value::Object(parse_json_object("job", raw)?));
        }
        if let Some(payload) = &self.job_payload {
            spec = spec.with_payload_override(parse_json_object("job_payload", payload)?);
        }
        if let Some(token) = &self.correlation_token {
            spec = spec.with_correlation_token(token);
        }
        for (key, value) in parse_pairs("label", &self.labels)? {
            spec = spec.with_label(key, value);
        }

        Ok(spec)
    }
}

impl JvmArgs {
    pub fn spark_job(&self) -> Result<SparkJob, StepError> {
        Ok(SparkJob {
            main_jar_file_uri: self.main_jar_file_uri.clone(),
            main_class: self.main_class.clone(),
            args: self.common.driver_args()?,
            jar_file_uris: self.common.jar_file_uris.clone(),
            file_uris: self.common.file_uris.clone(),
            archive_uris: self.common.archive_uris.clone(),
            properties: parse_pairs("property", &self.common.properties)?,
        })
    }

    pub fn hadoop_job(&self) -> Result<HadoopJob, StepError> {
        Ok(HadoopJob {
            main_jar_file_uri: self.main_jar_file_uri.clone(),
            main_class: self.main_class.clone(),
            args: self.common.driver_args()?,
            jar_file_uris: self.common.jar_file_uris.clone(),
            file_uris: self.common.file_uris.clone(),
            archive_uris: self.common.archive_uris.clone(),
            properties: parse_pairs("property", &self.common.properties)?,
        })
    }
}

impl PySparkArgs {
    pub fn pyspark_job(&self) -> Result<PySparkJob, StepError> {
        Ok(PySparkJob {
            main_python_file_uri: self.main_python_file_uri.clone(),
            args: self.common.driver_args()?,
            python_file_uris: self.python_file_uris.clone(),
            jar_file_uris: self.common.jar_file_uris.clone(),
            file_uris: self.common.file_uris.clone(),
            archive_uris: self.common.archive_uris.clone(),
            properties: parse_pairs("property", &self.common.properties)?,
        })
    }
}

impl DriverArgs {
    fn driver_args(&self) -> Result<Vec<String>, StepError> {
        match &self.args {
            Some(raw) => parse_json_list("args", raw),
            None => Ok(Vec::new()),
        }
    }
}

/// Parses a JSON list; scalars are stringified the way they would appear on
/// a command line
fn parse_json_list(name: &str, raw: &str) -> Result<Vec<String>, StepError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| StepError::InvalidSpec(format!("{name} is not valid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(StepError::InvalidSpec(format!("{name} must be a JSON list")));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(StepError::InvalidSpec(format!(
                "{name} items must be scalars, got {other}"
            ))),
        })
        .collect()
}

fn parse_json_object(name: &str, raw: &str) -> Result<Map<String, Value>, StepError> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StepError::InvalidSpec(format!(
            "{name} must be a JSON object"
        ))),
        Err(e) => Err(StepError::InvalidSpec(format!(
            "{name} is not valid JSON: {e}"
        ))),
    }
}

fn parse_pairs(name: &str, pairs: &[String]) -> Result<BTreeMap<String, String>, StepError> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(StepError::InvalidSpec(format!(
                "{name} must look like KEY=VALUE, got {pair:?}"
            ))),
        })
        .collect()
}
