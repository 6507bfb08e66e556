//! Overlap policy for scheduled jobs.
//!
//! A cron tick may fire while the previous run of the same job is still
//! going. The policy decides whether the new tick is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverlapPolicy {
    /// Skip the tick while a previous run is active.
    #[default]
    Skip,
    /// Let runs overlap.
    Concurrent,
}

/// Tracks whether a job is running.
#[derive(Clone)]
pub struct OverlapGuard {
    is_running: Arc<AtomicBool>,
    policy: OverlapPolicy,
}

impl OverlapGuard {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            is_running: Arc::new(AtomicBool::new(false)),
            policy,
        }
    }

    /// Returns `None` if the run must be skipped.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        match self.policy {
            OverlapPolicy::Skip => self
                .is_running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .ok()
                .map(|_| RunGuard {
                    flag: Arc::clone(&self.is_running),
                }),
            OverlapPolicy::Concurrent => Some(RunGuard {
                flag: Arc::new(AtomicBool::new(true)),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }
}

/// Clears the running flag when dropped, including on panic.
pub struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
