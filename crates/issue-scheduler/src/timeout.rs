//! Upper bound on the duration of a job run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// 0 means no timeout
    pub timeout_secs: u64,
}

impl TimeoutConfig {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn duration(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        assert_eq!(TimeoutConfig::none().duration(), None);
        assert_eq!(
            TimeoutConfig::new(600).duration(),
            Some(Duration::from_secs(600))
        );
    }
}
