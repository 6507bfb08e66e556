//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::{SchedulerError, SchedulerService};

/// Scheduler-wide settings; job schedules live in each job config.
///
/// Missing fields take their default when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// IANA name used by jobs registered without a timezone
    pub default_timezone: String,

    /// How long shutdown waits for cancelled jobs to report back
    pub shutdown_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            shutdown_timeout_secs: 30,
        }
    }
}

impl SchedulerConfig {
    pub fn parse_timezone(&self) -> Result<chrono_tz::Tz, SchedulerError> {
        SchedulerService::parse_timezone(&self.default_timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.default_timezone, "UTC");
        assert_eq!(config.shutdown_timeout_secs, 30);
        assert_eq!(config.parse_timezone().unwrap().name(), "UTC");
    }

    #[test]
    fn test_parse_invalid_timezone() {
        let config = SchedulerConfig {
            default_timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        match config.parse_timezone() {
            Err(SchedulerError::InvalidTimezone(tz)) => assert_eq!(tz, "Mars/Olympus"),
            other => panic!("Expected InvalidTimezone, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"default_timezone":"Europe/Paris"}"#).unwrap();
        assert_eq!(config.default_timezone, "Europe/Paris");
        assert_eq!(config.shutdown_timeout_secs, 30);
    }
}
