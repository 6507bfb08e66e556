//! Recovery queue replay job.
//!
//! Runs [`RecoveryIndexer::recover_now`] on a blocking thread. The overlap
//! guard keeps at most one pass running; a pass that outlives its timeout
//! is reported as failed and the next tick starts from the queue again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use issue_indexing::RecoveryIndexer;

use crate::{
    JitterConfig, JobOutput, OverlapPolicy, SchedulerError, SchedulerService, TimeoutConfig,
};

pub const RECOVERY_JOB_NAME: &str = "es_recovery";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecoveryJobConfig {
    /// Cron expression (default: "0 */5 * * * *" = every 5 minutes)
    pub cron: String,

    pub timezone: String,

    /// Max jitter in seconds (default: 30)
    pub jitter_secs: u64,

    /// Timeout in seconds (default: 600)
    pub timeout_secs: u64,
}

impl Default for RecoveryJobConfig {
    fn default() -> Self {
        Self {
            cron: "0 */5 * * * *".to_string(),
            timezone: "UTC".to_string(),
            jitter_secs: 30,
            timeout_secs: 600,
        }
    }
}

/// Register the recovery job with the scheduler.
pub async fn create_recovery_job(
    scheduler: &SchedulerService,
    recovery: Arc<RecoveryIndexer>,
    config: RecoveryJobConfig,
) -> Result<(), SchedulerError> {
    scheduler
        .register_job(
            RECOVERY_JOB_NAME,
            &config.cron,
            Some(&config.timezone),
            OverlapPolicy::Skip,
            JitterConfig::new(config.jitter_secs),
            TimeoutConfig::new(config.timeout_secs),
            move || {
                let recovery = Arc::clone(&recovery);
                async move { run_recovery(recovery).await }
            },
        )
        .await?;

    info!(cron = %config.cron, "Registered recovery job");
    Ok(())
}

/// Run one recovery pass off the async runtime.
pub async fn run_recovery(recovery: Arc<RecoveryIndexer>) -> Result<JobOutput, String> {
    let result = tokio::task::spawn_blocking(move || recovery.recover_now())
        .await
        .map_err(|e| format!("recovery task failed: {}", e))?
        .map_err(|e| e.to_string())?;

    Ok(JobOutput::new()
        .with_items_processed(result.total())
        .with_metadata("failures", result.failures().to_string()))
}
