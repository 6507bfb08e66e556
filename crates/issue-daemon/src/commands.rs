//! Command implementations for `issue-sync`.
//!
//! Every command opens the stores from the loaded [`Settings`]. Only
//! `start` keeps them open: it runs the recovery scheduler until SIGINT
//! or SIGTERM.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use issue_indexing::{
    IssueIndexer, ProjectIndexerCause, RecoveryConfig, RecoveryIndexer, StartupIndexer,
};
use issue_scheduler::{
    create_compaction_job, create_recovery_job, CompactionJobConfig, RecoveryJobConfig,
    SchedulerConfig, SchedulerService,
};
use issue_search::{IssueIndex, IssueIndexConfig, IssueSearcher, SearchOptions};
use issue_storage::Storage;
use issue_types::{Clock, IssueRow, Settings, SystemClock};

use crate::cli::{AdminCommands, Cli, QueueCommands};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db_path) = &cli.db_path {
        settings.db_path = db_path.clone();
    }
    if let Some(index_path) = &cli.index_path {
        settings.index_path = index_path.clone();
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_logging(log_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Open handles shared by all commands.
pub struct Stores {
    pub storage: Arc<Storage>,
    pub index: Arc<IssueIndex>,
    pub clock: Arc<dyn Clock>,
    pub indexer: Arc<IssueIndexer>,
}

impl Stores {
    pub fn open(settings: &Settings) -> Result<Self> {
        let db_path = expand_path(&settings.db_path);
        let index_path = expand_path(&settings.index_path);
        for dir in [&db_path, &index_path] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {:?}", dir))?;
        }

        let storage = Arc::new(Storage::open(&db_path).context("Failed to open storage")?);
        let index = Arc::new(
            IssueIndex::open_or_create(IssueIndexConfig::new(index_path))
                .context("Failed to open search index")?,
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let indexer = Arc::new(IssueIndexer::with_settings(
            Arc::clone(&storage),
            index.clone(),
            Arc::clone(&clock),
            settings.indexing.clone(),
        ));

        Ok(Self {
            storage,
            index,
            clock,
            indexer,
        })
    }

    pub fn recovery(&self, config: RecoveryConfig) -> RecoveryIndexer {
        RecoveryIndexer::new(Arc::clone(&self.storage), Arc::clone(&self.clock), config)
            .with_indexer(self.indexer.clone())
    }
}

/// Run the daemon.
///
/// 1. Open the stores
/// 2. Build the index if it is empty and startup indexing is enabled
/// 3. Schedule recovery and compaction
/// 4. Wait for SIGINT/SIGTERM and shut the scheduler down
pub async fn start_daemon(settings: &Settings, no_recovery: bool) -> Result<()> {
    info!("issue-sync starting...");
    info!("  Database path: {}", settings.db_path);
    info!("  Index path: {}", settings.index_path);
    info!("  Log level: {}", settings.log_level);

    let stores = Stores::open(settings)?;

    if settings.indexing.index_on_startup && stores.index.count() == 0 {
        let indexer = stores.indexer.clone();
        let result = tokio::task::spawn_blocking(move || indexer.index_on_startup())
            .await
            .context("Startup indexing task failed")?
            .context("Startup indexing failed")?;
        info!(total = result.total(), "Startup indexing complete");
    }

    let mut scheduler = SchedulerService::new(SchedulerConfig {
        default_timezone: settings.recovery.timezone.clone(),
        ..Default::default()
    })
    .await
    .context("Failed to create scheduler")?;

    if settings.recovery.enabled && !no_recovery {
        let recovery = Arc::new(stores.recovery(RecoveryConfig::from(&settings.recovery)));
        let job_config = RecoveryJobConfig {
            cron: settings.recovery.cron.clone(),
            timezone: settings.recovery.timezone.clone(),
            jitter_secs: settings.recovery.jitter_secs,
            timeout_secs: settings.recovery.timeout_secs,
        };
        create_recovery_job(&scheduler, recovery, job_config)
            .await
            .context("Failed to register recovery job")?;
    } else {
        warn!("Queue recovery is disabled");
    }
    create_compaction_job(
        &scheduler,
        Arc::clone(&stores.storage),
        CompactionJobConfig::default(),
    )
    .await
    .context("Failed to register compaction job")?;

    scheduler.start().await.context("Failed to start scheduler")?;
    shutdown_signal().await;
    scheduler.shutdown().await.context("Failed to stop scheduler")?;

    stores.storage.flush().context("Failed to flush storage")?;
    info!("issue-sync stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

/// Rebuild the whole index.
pub fn index_all(settings: &Settings) -> Result<()> {
    let stores = Stores::open(settings)?;
    let result = stores.indexer.index_all().context("Full reindex failed")?;
    println!("Indexed {} issues", result.total());
    Ok(())
}

/// Store the issues of a JSON file and index them, one transaction per
/// bulk.
pub fn import_issues(settings: &Settings, file: &str) -> Result<()> {
    let content =
        fs::read_to_string(expand_path(file)).with_context(|| format!("Failed to read {}", file))?;
    let rows: Vec<IssueRow> =
        serde_json::from_str(&content).with_context(|| format!("Invalid issue file {}", file))?;

    let stores = Stores::open(settings)?;
    let chunk_size = settings.indexing.regular_bulk_size.max(1);
    let (mut indexed, mut queued) = (0, 0);
    for chunk in rows.chunks(chunk_size) {
        let mut tx = stores.storage.begin();
        for row in chunk {
            tx.put_issue(row)?;
        }
        let result = stores.indexer.commit_and_index(tx, chunk)?;
        indexed += result.successes();
        queued += result.failures();
    }

    println!("Imported {} issues", rows.len());
    println!("  Indexed: {}", indexed);
    if queued > 0 {
        println!("  Left for recovery: {}", queued);
    }
    Ok(())
}

/// Resync a branch after a project event.
pub fn reindex_branch(settings: &Settings, branch: &str, cause: ProjectIndexerCause) -> Result<()> {
    let stores = Stores::open(settings)?;
    let result = stores.indexer.reindex_branch(branch, cause)?;
    println!(
        "Branch {} ({}): {} requests, {} failures",
        branch,
        cause,
        result.total(),
        result.failures()
    );
    Ok(())
}

/// Delete issue documents by key.
pub fn delete_issues(settings: &Settings, project: &str, keys: &[String]) -> Result<()> {
    let stores = Stores::open(settings)?;
    let result = stores.indexer.delete_by_keys(project, keys)?;
    println!("Deleted {} documents", result.successes());
    Ok(())
}

/// Run one recovery pass.
pub fn recover(settings: &Settings, min_age_ms: Option<i64>) -> Result<()> {
    let stores = Stores::open(settings)?;
    let mut config = RecoveryConfig::from(&settings.recovery);
    if let Some(min_age_ms) = min_age_ms {
        config.min_age_ms = min_age_ms;
    }
    let result = stores.recovery(config).recover_now()?;
    println!(
        "Recovered {} of {} documents ({} failures)",
        result.successes(),
        result.total(),
        result.failures()
    );
    println!("Queue size: {}", stores.storage.queue_size()?);
    Ok(())
}

pub fn handle_queue(settings: &Settings, command: QueueCommands) -> Result<()> {
    let stores = Stores::open(settings)?;
    match command {
        QueueCommands::Stats => {
            println!("Queue size: {}", stores.storage.queue_size()?);
            if let Some(oldest) = stores.storage.select_for_recovery(i64::MAX, 1)?.first() {
                let age_secs = (stores.clock.now_ms() - oldest.created_at_ms) / 1000;
                println!("Oldest item: {} ({}s old)", oldest.uuid, age_secs);
            }
        }
        QueueCommands::List { limit } => {
            let items = stores.storage.select_for_recovery(i64::MAX, limit)?;
            if items.is_empty() {
                println!("Queue is empty");
            }
            for item in items {
                println!("{}", item);
            }
        }
    }
    Ok(())
}

pub fn search(settings: &Settings, query: &str, branch: Option<String>, limit: usize) -> Result<()> {
    let stores = Stores::open(settings)?;
    let mut options = SearchOptions::new().with_limit(limit);
    if let Some(branch) = branch {
        options = options.with_branch(branch);
    }
    let hits = IssueSearcher::new(&stores.index).search(query, options)?;
    if hits.is_empty() {
        println!("No issues found");
    }
    for hit in hits {
        println!(
            "{:.3}  {}  branch={}  component={}",
            hit.score,
            hit.key,
            hit.branch_uuid.as_deref().unwrap_or("-"),
            hit.component_uuid.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub fn handle_admin(settings: &Settings, command: AdminCommands) -> Result<()> {
    let stores = Stores::open(settings)?;
    match command {
        AdminCommands::Stats => {
            let stats = stores.storage.get_stats()?;
            println!("Storage:");
            println!("  Issues: {}", stats.issue_count);
            println!("  Branch index entries: {}", stats.branch_index_count);
            println!("  Queue items: {}", stats.queue_count);
            println!("  Disk usage: {} bytes", stats.disk_usage_bytes);
            println!("Index:");
            println!("  Documents: {}", stores.index.count());
            println!("  Write locked: {}", stores.index.is_write_locked());
        }
        AdminCommands::Compact { cf } => match cf {
            Some(name) => {
                stores.storage.compact_cf(&name)?;
                println!("Compacted column family {}", name);
            }
            None => {
                stores.storage.compact()?;
                println!("Compacted all column families");
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        Settings {
            db_path: dir.path().join("db").to_string_lossy().to_string(),
            index_path: dir.path().join("index").to_string_lossy().to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_path_keeps_absolute() {
        assert_eq!(expand_path("/data/db"), PathBuf::from("/data/db"));
    }

    #[test]
    fn test_import_then_delete() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let file = dir.path().join("issues.json");
        let rows = vec![
            IssueRow::new("I1", "P1", "F1").with_message("Remove this unused import"),
            IssueRow::new("I2", "P1", "F1"),
        ];
        fs::write(&file, serde_json::to_string(&rows).unwrap()).unwrap();

        import_issues(&settings, &file.to_string_lossy()).unwrap();
        {
            let stores = Stores::open(&settings).unwrap();
            assert_eq!(stores.index.count(), 2);
            assert_eq!(stores.storage.queue_size().unwrap(), 0);
        }

        delete_issues(&settings, "P1", &["I1".to_string()]).unwrap();
        let stores = Stores::open(&settings).unwrap();
        assert_eq!(stores.index.count(), 1);
    }

    #[test]
    fn test_import_rejects_invalid_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("issues.json");
        fs::write(&file, "{not json").unwrap();
        assert!(import_issues(&settings(&dir), &file.to_string_lossy()).is_err());
    }

    #[test]
    fn test_recover_and_admin_commands() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        recover(&settings, Some(0)).unwrap();
        handle_queue(&settings, QueueCommands::Stats).unwrap();
        handle_queue(&settings, QueueCommands::List { limit: 5 }).unwrap();
        handle_admin(&settings, AdminCommands::Stats).unwrap();
        handle_admin(&settings, AdminCommands::Compact { cf: None }).unwrap();
        index_all(&settings).unwrap();
    }
}
