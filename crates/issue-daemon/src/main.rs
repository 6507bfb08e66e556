//! issue-sync
//!
//! Keeps an issue search index in sync with the issue store.
//!
//! # Usage
//!
//! ```bash
//! issue-sync start
//! issue-sync import issues.json
//! issue-sync reindex <branch> --cause project-deletion
//! issue-sync recover --min-age-ms 0
//! issue-sync queue stats
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (platform config dir, e.g. ~/.config/issue-sync/config.toml)
//! 3. `--config` file
//! 4. Environment variables (ISSUE_SYNC__*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use issue_daemon::{
    delete_issues, handle_admin, handle_queue, import_issues, index_all, init_logging,
    load_settings, recover, reindex_branch, search, start_daemon, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Start { no_recovery } => start_daemon(&settings, no_recovery).await?,
        Commands::Index => index_all(&settings)?,
        Commands::Import { file } => import_issues(&settings, &file)?,
        Commands::Reindex { branch, cause } => reindex_branch(&settings, &branch, cause)?,
        Commands::Delete { project, keys } => delete_issues(&settings, &project, &keys)?,
        Commands::Recover { min_age_ms } => recover(&settings, min_age_ms)?,
        Commands::Queue { command } => handle_queue(&settings, command)?,
        Commands::Search {
            query,
            branch,
            limit,
        } => search(&settings, &query, branch, limit)?,
        Commands::Admin { command } => handle_admin(&settings, command)?,
    }

    Ok(())
}
