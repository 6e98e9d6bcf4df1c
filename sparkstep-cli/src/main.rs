//! Sparkstep CLI
//!
//! Command-line interface for inspecting and cancelling jobs on the remote
//! job service.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sparkstep")]
#[command(about = "Sparkstep job service CLI", long_about = None)]
struct Cli {
    /// Job service endpoint
    #[arg(
        long,
        env = "SPARKSTEP_ENDPOINT",
        default_value = "https://dataproc.googleapis.com"
    )]
    endpoint: String,

    #[arg(long, env = "SPARKSTEP_PROJECT_ID")]
    project_id: String,

    #[arg(long, env = "SPARKSTEP_REGION")]
    region: String,

    /// Bearer token for the job service
    #[arg(long, env = "SPARKSTEP_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sparkstep_cli=warn,sparkstep_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        endpoint: cli.endpoint,
        project_id: cli.project_id,
        region: cli.region,
        access_token: cli.access_token,
    };

    handle_command(cli.command, &config).await
}
