//! Configuration loading for issue-sync.
//!
//! Layered config: defaults -> platform config file -> `--config` file ->
//! `ISSUE_SYNC__*` environment variables. CLI flags are applied on top by
//! the daemon.

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

const APP_NAME: &str = "issue-sync";

/// Recovery runner and its schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoverySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 6-field cron expression (sec min hour day month weekday)
    #[serde(default = "default_recovery_cron")]
    pub cron: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Queue items younger than this are left alone so in-flight commits
    /// can remove their own items first.
    #[serde(default = "default_min_age_ms")]
    pub min_age_ms: i64,

    /// Maximum number of queue items loaded per recovery batch
    #[serde(default = "default_loop_limit")]
    pub loop_limit: usize,

    #[serde(default = "default_recovery_jitter")]
    pub jitter_secs: u64,

    #[serde(default = "default_recovery_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_recovery_cron() -> String {
    "0 */5 * * * *".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_min_age_ms() -> i64 {
    5 * 60 * 1000
}

fn default_loop_limit() -> usize {
    10_000
}

fn default_recovery_jitter() -> u64 {
    30
}

fn default_recovery_timeout() -> u64 {
    600
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_recovery_cron(),
            timezone: default_timezone(),
            min_age_ms: default_min_age_ms(),
            loop_limit: default_loop_limit(),
            jitter_secs: default_recovery_jitter(),
            timeout_secs: default_recovery_timeout(),
        }
    }
}

impl RecoverySettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_age_ms < 0 {
            return Err(format!("min_age_ms must be >= 0, got {}", self.min_age_ms));
        }
        if self.loop_limit == 0 {
            return Err("loop_limit must be > 0".to_string());
        }
        Ok(())
    }
}

/// Bulk request sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexingSettings {
    /// Requests per bulk call for commit-time and recovery indexing
    #[serde(default = "default_regular_bulk_size")]
    pub regular_bulk_size: usize,

    /// Requests per bulk call for full reindexing
    #[serde(default = "default_large_bulk_size")]
    pub large_bulk_size: usize,

    /// Run a full index at startup when the index is empty
    #[serde(default = "default_true")]
    pub index_on_startup: bool,
}

fn default_regular_bulk_size() -> usize {
    500
}

fn default_large_bulk_size() -> usize {
    5_000
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            regular_bulk_size: default_regular_bulk_size(),
            large_bulk_size: default_large_bulk_size(),
            index_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_index_path")]
    pub index_path: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub recovery: RecoverySettings,

    #[serde(default)]
    pub indexing: IndexingSettings,
}

fn data_dir_join(name: &str) -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.data_local_dir().join(name))
        .unwrap_or_else(|| PathBuf::from(".").join(name))
        .to_string_lossy()
        .to_string()
}

fn default_db_path() -> String {
    data_dir_join("db")
}

fn default_index_path() -> String {
    data_dir_join("issue-index")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            index_path: default_index_path(),
            log_level: default_log_level(),
            recovery: RecoverySettings::default(),
            indexing: IndexingSettings::default(),
        }
    }
}

fn config_err(e: config::ConfigError) -> SyncError {
    SyncError::Config(e.to_string())
}

impl Settings {
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, SyncError> {
        let config_dir = ProjectDirs::from("", "", APP_NAME)
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let default_config_path = config_dir.join("config");

        let recovery = RecoverySettings::default();
        let indexing = IndexingSettings::default();

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(config_err)?
            .set_default("index_path", default_index_path())
            .map_err(config_err)?
            .set_default("log_level", default_log_level())
            .map_err(config_err)?
            .set_default("recovery.enabled", recovery.enabled)
            .map_err(config_err)?
            .set_default("recovery.cron", recovery.cron)
            .map_err(config_err)?
            .set_default("recovery.timezone", recovery.timezone)
            .map_err(config_err)?
            .set_default("recovery.min_age_ms", recovery.min_age_ms)
            .map_err(config_err)?
            .set_default("recovery.loop_limit", recovery.loop_limit as i64)
            .map_err(config_err)?
            .set_default("recovery.jitter_secs", recovery.jitter_secs)
            .map_err(config_err)?
            .set_default("recovery.timeout_secs", recovery.timeout_secs)
            .map_err(config_err)?
            .set_default("indexing.regular_bulk_size", indexing.regular_bulk_size as i64)
            .map_err(config_err)?
            .set_default("indexing.large_bulk_size", indexing.large_bulk_size as i64)
            .map_err(config_err)?
            .set_default("indexing.index_on_startup", indexing.index_on_startup)
            .map_err(config_err)?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // ISSUE_SYNC__DB_PATH, ISSUE_SYNC__RECOVERY__MIN_AGE_MS, ...
        builder = builder.add_source(
            Environment::with_prefix("ISSUE_SYNC")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(config_err)?
            .try_deserialize()
            .map_err(config_err)?;

        settings.recovery.validate().map_err(SyncError::Config)?;
        Ok(settings)
    }
}
