//! Background job scheduler for the issue-sync daemon.
//!
//! Async cron scheduling on `tokio-cron-scheduler` with timezone support
//! and graceful shutdown.
//!
//! # Features
//!
//! - Cron expressions with seconds (`0 */5 * * * *`)
//! - Timezone-aware schedules via chrono-tz
//! - Overlap policy, jitter and timeout per job
//! - Job status observability via [`JobRegistry`]
//! - Cancellation of running jobs on shutdown
//!
//! # Example
//!
//! ```ignore
//! use issue_scheduler::{create_recovery_job, RecoveryJobConfig, SchedulerConfig, SchedulerService};
//!
//! let scheduler = SchedulerService::new(SchedulerConfig::default()).await?;
//! create_recovery_job(&scheduler, recovery, RecoveryJobConfig::default()).await?;
//! scheduler.start().await?;
//!
//! let status = scheduler.registry().get_status("es_recovery");
//! ```

mod config;
mod error;
mod jitter;
mod overlap;
mod registry;
mod scheduler;
mod timeout;

#[cfg(feature = "jobs")]
pub mod jobs;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use jitter::{with_jitter, JitterConfig};
pub use overlap::{OverlapGuard, OverlapPolicy, RunGuard};
pub use registry::{JobOutput, JobRegistry, JobResult, JobStatus};
pub use scheduler::{validate_cron_expression, SchedulerService};
pub use timeout::TimeoutConfig;

#[cfg(feature = "jobs")]
pub use jobs::{
    create_compaction_job, create_recovery_job, run_compaction, run_recovery,
    CompactionJobConfig, RecoveryJobConfig,
};
