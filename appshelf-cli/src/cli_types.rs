//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use appshelf_core::AppId;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "appshelf")]
#[command(about = "Browse, verify and reconcile a remote application catalog", long_about = None)]
pub(crate) struct Cli {
    /// Catalog source: an http(s) URL or a local JSON file (defaults to the configured URL)
    #[arg(short, long, global = true)]
    pub source: Option<String>,

    /// Number of verification workers (1-64)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Never contact the store API (cached classifications and requirements only)
    #[arg(long, global = true)]
    pub offline: bool,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by the query commands.
#[derive(Args, Clone)]
pub(crate) struct QueryArgs {
    /// Case-insensitive substring of the title, or part of the id
    #[arg(default_value = "")]
    pub text: String,

    /// Only entries whose store assets were confirmed to exist
    #[arg(long)]
    pub verified: bool,

    /// Seconds to let verification run before answering (verified queries only)
    #[arg(long, default_value_t = 10)]
    pub wait: u64,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Load the catalog and print a summary
    Load,

    /// Search the catalog
    Search {
        #[command(flatten)]
        query: QueryArgs,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Entries per page
        #[arg(long, default_value_t = 25)]
        page_size: usize,
    },

    /// Count matching entries
    Count {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Verify the whole catalog with a progress display
    Verify {
        /// Give up after this many seconds
        #[arg(long, default_value_t = 600)]
        wait: u64,
    },

    /// Show everything known about one entry
    Info {
        id: AppId,
    },

    /// Resolve categories for ids
    Classify {
        #[arg(required = true)]
        ids: Vec<AppId>,

        /// Fetch unknown categories from the store
        #[arg(long)]
        network: bool,
    },

    /// Show PC requirements for an id
    Requirements {
        id: AppId,

        /// Fetch from the store when nothing is cached
        #[arg(long)]
        network: bool,
    },

    /// Inspect or neutralize manifest directives in the plugin directory
    Patch {
        #[command(subcommand)]
        action: PatchAction,
    },

    /// Manage cached lookups
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum PatchAction {
    /// Report whether an id still has active directives
    Scan {
        id: AppId,

        /// Plugin directory (defaults to the one under the install root)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Neutralize active directives for an id
    Apply {
        id: AppId,

        /// Plugin directory (defaults to the one under the install root)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Extra script files to patch
        files: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// List cache files
    List,

    /// Remove all cache files
    Clear,
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show effective settings
    Show,

    /// Write the effective settings to the settings file
    Init,

    /// Print the settings file path
    Path,
}
