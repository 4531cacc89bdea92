use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use appshelf_core::util::format_bytes_approx;

use crate::error::CliError;

/// List cache files.
pub(crate) fn run_cache_list() -> Result<(), CliError> {
    let dir = appshelf_cache::cache_dir()?;
    let entries = appshelf_cache::list(&dir);
    if entries.is_empty() {
        log::info!(
            "{}",
            "No cache files.".if_supports_color(Stdout, |t| t.dimmed()),
        );
        log::info!("Lookups are cached as 'appshelf classify' and 'appshelf requirements' run.");
        return Ok(());
    }

    log::info!(
        "{} {}",
        "Cache files in".if_supports_color(Stdout, |t| t.bold()),
        dir.display(),
    );
    log::info!("");

    let mut total_size = 0u64;
    for entry in &entries {
        total_size += entry.file_size;
        log::info!(
            "  {} [{}]",
            entry.kind.label().if_supports_color(Stdout, |t| t.bold()),
            entry.kind.file_name().if_supports_color(Stdout, |t| t.cyan()),
        );
        log::info!(
            "    Entries: {}, Size: {}, Modified: {}",
            entry.entry_count,
            format_bytes_approx(entry.file_size),
            entry.modified.as_deref().unwrap_or("unknown"),
        );
    }
    log::info!("");
    log::info!(
        "Total: {} files, {}",
        entries.len(),
        format_bytes_approx(total_size)
    );
    Ok(())
}

/// Clear the cache.
pub(crate) fn run_cache_clear() -> Result<(), CliError> {
    let dir = appshelf_cache::cache_dir()?;
    let freed = appshelf_cache::clear(&dir)?;
    log::info!(
        "{} Cache cleared ({} freed)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        format_bytes_approx(freed),
    );
    Ok(())
}
