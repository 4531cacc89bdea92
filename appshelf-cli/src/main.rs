//! appshelf CLI
//!
//! Command-line front end for the catalog engine: loading, searching,
//! verifying, classification lookups and plugin-directory patching.

mod cli_types;
mod commands;
mod error;

use std::io::Write;

use clap::Parser;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use appshelf_lib::Settings;

use cli_types::{CacheAction, Cli, Commands, ConfigAction, PatchAction};
use error::CliError;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    if let Err(e) = run(cli) {
        log::error!(
            "{} {}",
            "\u{2718}".if_supports_color(Stderr, |t| t.red()),
            e
        );
        std::process::exit(1);
    }
}

/// Route `log` output to the terminal. Normal runs print bare messages so
/// `log::info!` doubles as command output; verbose runs get the full format.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        log::LevelFilter::Warn
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Warn);
    for module in ["appshelf", "appshelf_lib", "appshelf_remote", "appshelf_cache"] {
        builder.filter_module(module, level);
    }
    if !verbose {
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    }
    builder.parse_default_env();
    builder.init();
}

/// Settings from disk with command-line overrides applied.
fn effective_settings(cli: &Cli) -> Settings {
    let mut settings = Settings::load();
    if let Some(workers) = cli.workers {
        settings.workers = workers;
    }
    if cli.offline {
        settings.no_network = true;
    }
    settings
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = effective_settings(&cli);
    let source = cli.source.as_deref();

    match &cli.command {
        Commands::Cache { action } => {
            return match action {
                CacheAction::List => commands::cache::run_cache_list(),
                CacheAction::Clear => commands::cache::run_cache_clear(),
            };
        }
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => commands::config::run_config_show(&settings),
                ConfigAction::Init => commands::config::run_config_init(&settings),
                ConfigAction::Path => commands::config::run_config_path(),
            };
        }
        _ => {}
    }

    let rt = tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))?;
    rt.block_on(async {
        let library = commands::open_library(settings)?;
        let result = match cli.command {
            Commands::Load => commands::catalog::run_load(&library, source).await,
            Commands::Search {
                query,
                page,
                page_size,
            } => commands::catalog::run_search(&library, source, &query, page, page_size).await,
            Commands::Count { query } => {
                commands::catalog::run_count(&library, source, &query).await
            }
            Commands::Info { id } => commands::catalog::run_info(&library, source, id).await,
            Commands::Verify { wait } => commands::verify::run_verify(&library, source, wait).await,
            Commands::Classify { ids, network } => {
                commands::lookup::run_classify(&library, &ids, network).await
            }
            Commands::Requirements { id, network } => {
                commands::lookup::run_requirements(&library, id, network).await
            }
            Commands::Patch { action } => match action {
                PatchAction::Scan { id, dir } => {
                    commands::patch::run_patch_scan(&library, id, dir.as_deref())
                }
                PatchAction::Apply { id, dir, files } => {
                    commands::patch::run_patch_apply(&library, id, dir.as_deref(), &files)
                }
            },
            Commands::Cache { .. } | Commands::Config { .. } => Ok(()),
        };
        library.shutdown();
        result
    })
}
