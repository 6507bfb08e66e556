//! Scheduler service wrapper around tokio-cron-scheduler.
//!
//! Every job registered through [`SchedulerService::register_job`] runs
//! behind the same envelope: overlap check, jitter, timeout, cancellation
//! on shutdown, and an entry in the [`JobRegistry`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::jitter::with_jitter;
use crate::{
    JitterConfig, JobOutput, JobRegistry, JobResult, OverlapGuard, OverlapPolicy,
    SchedulerConfig, SchedulerError, TimeoutConfig,
};

/// Validate a 6-field cron expression (sec min hour day month weekday).
///
/// ```
/// use issue_scheduler::validate_cron_expression;
///
/// assert!(validate_cron_expression("0 */5 * * * *").is_ok());
/// assert!(validate_cron_expression("invalid").is_err());
/// ```
pub fn validate_cron_expression(expr: &str) -> Result<(), SchedulerError> {
    Job::new_async(expr, |_uuid, _lock| Box::pin(async {}))
        .map(|_| ())
        .map_err(|e| SchedulerError::InvalidCron(format!("'{}': {}", expr, e)))
}

pub struct SchedulerService {
    scheduler: JobScheduler,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
    is_running: AtomicBool,
    registry: Arc<JobRegistry>,
}

impl SchedulerService {
    /// Create a stopped scheduler.
    pub async fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.parse_timezone()?;
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            config,
            shutdown_token: CancellationToken::new(),
            is_running: AtomicBool::new(false),
            registry: Arc::new(JobRegistry::new()),
        })
    }

    /// # Errors
    ///
    /// Returns `SchedulerError::AlreadyRunning` if already started.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }
        self.scheduler.start().await?;
        info!("Scheduler started");
        Ok(())
    }

    /// Cancel running jobs, wait for them up to the shutdown timeout, then
    /// stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }
        info!("Initiating scheduler shutdown");
        self.shutdown_token.cancel();

        let deadline = Instant::now() + Duration::from_secs(self.config.shutdown_timeout_secs);
        while self.registry.get_all_status().iter().any(|s| s.is_running) {
            if Instant::now() >= deadline {
                warn!("Jobs still running at shutdown deadline");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        if let Err(e) = self.scheduler.shutdown().await {
            warn!(error = %e, "Error during scheduler shutdown");
        }
        self.is_running.store(false, Ordering::SeqCst);
        info!("Scheduler shutdown complete");
        Ok(())
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> Arc<JobRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Register a cron job.
    ///
    /// `timezone` falls back to the configured default. The job returns
    /// `Err(message)` on failure; the message is kept in the registry.
    #[allow(clippy::too_many_arguments)]
    pub async fn register_job<F, Fut>(
        &self,
        name: &str,
        cron_expr: &str,
        timezone: Option<&str>,
        overlap: OverlapPolicy,
        jitter: JitterConfig,
        timeout: TimeoutConfig,
        job_fn: F,
    ) -> Result<uuid::Uuid, SchedulerError>
    where
        F: Fn() -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<JobOutput, String>> + Send + 'static,
    {
        let tz: Tz = match timezone {
            Some(tz_str) => Self::parse_timezone(tz_str)?,
            None => self.config.parse_timezone()?,
        };
        validate_cron_expression(cron_expr)?;
        if self.registry.is_registered(name) {
            return Err(SchedulerError::DuplicateJob(name.to_string()));
        }

        self.registry.register(name, cron_expr);
        let runner = JobRunner {
            name: name.to_string(),
            registry: Arc::clone(&self.registry),
            guard: OverlapGuard::new(overlap),
            token: self.shutdown_token.clone(),
            jitter,
            timeout,
        };

        let job = Job::new_async_tz(cron_expr, tz, move |_uuid, _lock| {
            let runner = runner.clone();
            let job_fn = job_fn.clone();
            Box::pin(async move {
                runner.run(job_fn).await;
            })
        })
        .map_err(|e| SchedulerError::InvalidCron(e.to_string()))?;

        let uuid = self.scheduler.add(job).await?;
        info!(job = %name, uuid = %uuid, cron = %cron_expr, timezone = %tz.name(), "Job registered");
        Ok(uuid)
    }

    pub fn parse_timezone(tz_str: &str) -> Result<Tz, SchedulerError> {
        tz_str
            .parse()
            .map_err(|_| SchedulerError::InvalidTimezone(tz_str.to_string()))
    }
}

/// Everything one tick of a job needs.
#[derive(Clone)]
pub(crate) struct JobRunner {
    pub(crate) name: String,
    pub(crate) registry: Arc<JobRegistry>,
    pub(crate) guard: OverlapGuard,
    pub(crate) token: CancellationToken,
    pub(crate) jitter: JitterConfig,
    pub(crate) timeout: TimeoutConfig,
}

impl JobRunner {
    pub(crate) async fn run<F, Fut>(&self, job_fn: F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<JobOutput, String>>,
    {
        if self.token.is_cancelled() {
            return;
        }
        let Some(_run) = self.guard.try_acquire() else {
            debug!(job = %self.name, "Previous run still active, skipping");
            self.registry.record_complete(
                &self.name,
                JobResult::Skipped("previous run still active".to_string()),
                0,
            );
            return;
        };

        self.registry.record_start(&self.name);
        let start = Instant::now();

        let work = with_jitter(self.jitter, job_fn());
        let bounded = async {
            match self.timeout.duration() {
                Some(limit) => tokio::time::timeout(limit, work)
                    .await
                    .unwrap_or_else(|_| Err(format!("timed out after {}s", limit.as_secs()))),
                None => work.await,
            }
        };
        let outcome = tokio::select! {
            result = bounded => result,
            _ = self.token.cancelled() => Err("cancelled by shutdown".to_string()),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(output) => {
                info!(job = %self.name, duration_ms, "Job completed");
                self.registry.record_complete_with_metadata(
                    &self.name,
                    JobResult::Success,
                    duration_ms,
                    output.metadata,
                );
            }
            Err(message) => {
                warn!(job = %self.name, duration_ms, error = %message, "Job failed");
                self.registry
                    .record_complete(&self.name, JobResult::Failed(message), duration_ms);
            }
        }
    }
}
