//! Job registry for tracking job metadata and execution status.
//!
//! Thread-safe record of every registered job: last run, duration,
//! outcome and counters, plus free-form metadata reported by the job.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a job execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobResult {
    Success,
    /// Job failed with an error message
    Failed(String),
    /// Job was skipped (overlap policy)
    Skipped(String),
}

/// Metadata a job reports about its run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutput {
    pub metadata: HashMap<String, String>,
}

impl JobOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_items_processed(self, count: u64) -> Self {
        self.with_metadata("items_processed", count.to_string())
    }
}

/// Status of a registered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_name: String,
    pub cron_expr: String,
    /// When the job last finished (if ever)
    pub last_run: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_result: Option<JobResult>,
    pub run_count: u64,
    pub error_count: u64,
    pub is_running: bool,
    #[serde(default)]
    pub last_run_metadata: HashMap<String, String>,
}

impl JobStatus {
    pub fn new(job_name: String, cron_expr: String) -> Self {
        Self {
            job_name,
            cron_expr,
            last_run: None,
            last_duration_ms: None,
            last_result: None,
            run_count: 0,
            error_count: 0,
            is_running: false,
            last_run_metadata: HashMap::new(),
        }
    }
}

/// Registry for tracking job metadata and execution status.
///
/// # Example
///
/// ```
/// use issue_scheduler::{JobRegistry, JobResult};
///
/// let registry = JobRegistry::new();
/// registry.register("es_recovery", "0 */5 * * * *");
///
/// registry.record_start("es_recovery");
/// assert!(registry.is_running("es_recovery"));
///
/// registry.record_complete("es_recovery", JobResult::Success, 1500);
/// assert!(!registry.is_running("es_recovery"));
/// ```
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobStatus>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    // A panicking job must not make the registry unusable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a job, replacing any job with the same name.
    pub fn register(&self, job_name: &str, cron_expr: &str) {
        self.write().insert(
            job_name.to_string(),
            JobStatus::new(job_name.to_string(), cron_expr.to_string()),
        );
    }

    pub fn record_start(&self, job_name: &str) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.is_running = true;
        }
    }

    pub fn record_complete(&self, job_name: &str, result: JobResult, duration_ms: u64) {
        self.record_complete_with_metadata(job_name, result, duration_ms, HashMap::new());
    }

    /// Record a finished run with the metadata it reported.
    pub fn record_complete_with_metadata(
        &self,
        job_name: &str,
        result: JobResult,
        duration_ms: u64,
        metadata: HashMap<String, String>,
    ) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.is_running = false;
            status.last_run = Some(Utc::now());
            status.last_duration_ms = Some(duration_ms);
            status.run_count += 1;
            if matches!(result, JobResult::Failed(_)) {
                status.error_count += 1;
            }
            status.last_result = Some(result);
            status.last_run_metadata = metadata;
        }
    }

    pub fn get_status(&self, job_name: &str) -> Option<JobStatus> {
        self.read().get(job_name).cloned()
    }

    /// Status of every job, sorted by name.
    pub fn get_all_status(&self) -> Vec<JobStatus> {
        let mut all: Vec<JobStatus> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        all
    }

    pub fn is_running(&self, job_name: &str) -> bool {
        self.read()
            .get(job_name)
            .map(|s| s.is_running)
            .unwrap_or(false)
    }

    pub fn is_registered(&self, job_name: &str) -> bool {
        self.read().contains_key(job_name)
    }

    pub fn job_count(&self) -> usize {
        self.read().len()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
