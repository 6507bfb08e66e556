//! RocksDB compaction job.
//!
//! Reclaims space left by deleted queue items and issue rows. Runs weekly
//! at 4 AM Sunday by default.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use issue_storage::Storage;

use crate::{
    JitterConfig, JobOutput, OverlapPolicy, SchedulerError, SchedulerService, TimeoutConfig,
};

pub const COMPACTION_JOB_NAME: &str = "rocksdb_compaction";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionJobConfig {
    /// Cron expression (default: "0 0 4 * * 0" = 4 AM Sunday)
    pub cron: String,

    pub timezone: String,

    /// Max jitter in seconds (default: 600 = 10 min)
    pub jitter_secs: u64,

    /// Timeout in seconds (default: 3600 = 1 hour)
    pub timeout_secs: u64,
}

impl Default for CompactionJobConfig {
    fn default() -> Self {
        Self {
            cron: "0 0 4 * * 0".to_string(),
            timezone: "UTC".to_string(),
            jitter_secs: 600,
            timeout_secs: 3600,
        }
    }
}

/// Register the compaction job with the scheduler.
pub async fn create_compaction_job(
    scheduler: &SchedulerService,
    storage: Arc<Storage>,
    config: CompactionJobConfig,
) -> Result<(), SchedulerError> {
    scheduler
        .register_job(
            COMPACTION_JOB_NAME,
            &config.cron,
            Some(&config.timezone),
            OverlapPolicy::Skip,
            JitterConfig::new(config.jitter_secs),
            TimeoutConfig::new(config.timeout_secs),
            move || {
                let storage = Arc::clone(&storage);
                async move { run_compaction(storage).await }
            },
        )
        .await?;

    info!("Registered compaction job");
    Ok(())
}

/// Compact every column family, then report the remaining queue size.
pub async fn run_compaction(storage: Arc<Storage>) -> Result<JobOutput, String> {
    info!("Starting manual compaction");
    let queue_size = tokio::task::spawn_blocking(move || {
        storage.compact()?;
        storage.queue_size()
    })
    .await
    .map_err(|e| format!("compaction task failed: {}", e))?
    .map_err(|e| e.to_string())?;

    info!(queue_size, "Compaction complete");
    Ok(JobOutput::new().with_metadata("queue_size", queue_size.to_string()))
}
