//! Random start delay for scheduled jobs.
//!
//! Several daemons sharing a schedule would otherwise hit the stores at the
//! same second.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Maximum random delay applied before a job runs.
///
/// ```
/// use issue_scheduler::JitterConfig;
///
/// let config = JitterConfig::new(30);
/// assert!(config.generate_jitter() < std::time::Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JitterConfig {
    /// 0 disables jitter
    pub max_jitter_secs: u64,
}

impl JitterConfig {
    pub fn new(max_jitter_secs: u64) -> Self {
        Self { max_jitter_secs }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// A random duration in `[0, max_jitter_secs)`.
    pub fn generate_jitter(&self) -> Duration {
        if self.max_jitter_secs == 0 {
            return Duration::ZERO;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..self.max_jitter_secs * 1000);
        Duration::from_millis(jitter_ms)
    }

    pub fn is_enabled(&self) -> bool {
        self.max_jitter_secs > 0
    }
}

/// Sleep for a random jitter, then await `job`.
pub async fn with_jitter<F, T>(config: JitterConfig, job: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let jitter = config.generate_jitter();
    if !jitter.is_zero() {
        tracing::debug!(jitter_ms = jitter.as_millis() as u64, "Applying jitter delay");
        tokio::time::sleep(jitter).await;
    }
    job.await
}
