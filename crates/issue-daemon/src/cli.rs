//! CLI argument parsing for `issue-sync`.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};
use issue_indexing::ProjectIndexerCause;

/// Issue search index synchronizer
///
/// Keeps the issue search index in sync with the issue store and replays
/// failed index writes from the recovery queue.
#[derive(Parser, Debug)]
#[command(name = "issue-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides the platform config file)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    /// Override search index path
    #[arg(long, global = true)]
    pub index_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the recovery scheduler until interrupted
    Start {
        /// Do not schedule queue recovery
        #[arg(long)]
        no_recovery: bool,
    },

    /// Rebuild the whole index from the issue store
    Index,

    /// Store issues from a JSON array file and index them
    Import {
        /// JSON file containing an array of issues
        file: String,
    },

    /// Resync the issues of a branch after a project event
    Reindex {
        /// Branch UUID (the project UUID for the main branch)
        branch: String,

        /// Event that triggered the resync
        #[arg(long, default_value = "project-deletion")]
        cause: ProjectIndexerCause,
    },

    /// Delete issue documents from the index
    Delete {
        /// Project UUID used for routing
        project: String,

        /// Issue keys
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Run one recovery pass now
    Recover {
        /// Override the minimum age of replayed items
        #[arg(long)]
        min_age_ms: Option<i64>,
    },

    /// Inspect the recovery queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },

    /// Full-text search over indexed issues
    Search {
        query: String,

        /// Restrict to one branch
        #[arg(long)]
        branch: Option<String>,

        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum QueueCommands {
    /// Show queue size and age of the oldest item
    Stats,

    /// List the oldest queue items
    List {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommands {
    /// Show storage and index statistics
    Stats,

    /// Trigger RocksDB compaction
    Compact {
        /// Compact only this column family
        #[arg(long)]
        cf: Option<String>,
    },
}
