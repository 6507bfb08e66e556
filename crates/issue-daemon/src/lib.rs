//! issue-sync daemon library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations

pub mod cli;
pub mod commands;

pub use cli::{AdminCommands, Cli, Commands, QueueCommands};
pub use commands::{
    delete_issues, handle_admin, handle_queue, import_issues, index_all, init_logging,
    load_settings, recover, reindex_branch, search, start_daemon, Stores,
};
