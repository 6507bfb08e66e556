//! Outcome counters of one synchronization call.

use std::fmt;

/// Counts requests sent to the index and how many of them succeeded.
///
/// `failures` is always `total - successes`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexingResult {
    total: u64,
    successes: u64,
}

impl IndexingResult {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counts(successes: u64, failures: u64) -> Self {
        Self {
            total: successes + failures,
            successes,
        }
    }

    pub fn add_success(&mut self) {
        self.total += 1;
        self.successes += 1;
    }

    pub fn add_failure(&mut self) {
        self.add_failures(1);
    }

    pub fn add_failures(&mut self, count: u64) {
        self.total += count;
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: &IndexingResult) {
        self.total += other.total;
        self.successes += other.successes;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.total - self.successes
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }

    /// Share of successful requests, 1.0 when nothing was sent.
    pub fn success_ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.successes as f64 / self.total as f64
        }
    }
}

impl fmt::Display for IndexingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests, {} successes, {} failures",
            self.total,
            self.successes,
            self.failures()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_is_success() {
        let result = IndexingResult::new();
        assert_eq!(result.total(), 0);
        assert!(result.is_success());
        assert_eq!(result.success_ratio(), 1.0);
    }

    #[test]
    fn test_counts() {
        let mut result = IndexingResult::new();
        result.add_success();
        result.add_success();
        result.add_failure();
        result.add_failures(2);

        assert_eq!(result.total(), 5);
        assert_eq!(result.successes(), 2);
        assert_eq!(result.failures(), 3);
        assert!(!result.is_success());
        assert!((result.success_ratio() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge() {
        let mut result = IndexingResult::from_counts(3, 1);
        result.merge(&IndexingResult::from_counts(1, 0));
        assert_eq!(result, IndexingResult::from_counts(4, 1));
        assert_eq!(result.to_string(), "5 requests, 4 successes, 1 failures");
    }
}
