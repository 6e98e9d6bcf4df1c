//! Step outputs handed to downstream steps

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Writes the job id to `path`, creating parent directories
pub async fn write_job_id(path: &Path, job_id: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    tokio::fs::write(path, job_id)
        .await
        .with_context(|| format!("Failed to write job id to {}", path.display()))?;

    info!("Wrote job id to {}", path.display());
    Ok(())
}
