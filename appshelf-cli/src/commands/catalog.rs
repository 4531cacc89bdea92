use std::time::Duration;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use appshelf_lib::{AppId, CatalogRecord, Classification, PatchState};

use super::{CliLibrary, load_catalog, settle};
use crate::cli_types::QueryArgs;
use crate::error::CliError;

/// Category text for `info`. A resolved empty category is not the same
/// as one that was never looked up.
fn category_label(classification: &Classification) -> &str {
    match classification {
        Classification::Unknown => "(unknown)",
        Classification::Resolved(c) if c.trim().is_empty() => "(none)",
        Classification::Resolved(c) => c,
    }
}

/// Marker shown next to an entry for its availability.
fn availability_mark(available: Option<bool>) -> String {
    match available {
        Some(true) => "\u{2714}".if_supports_color(Stdout, |t| t.green()).to_string(),
        Some(false) => "\u{2718}".if_supports_color(Stdout, |t| t.red()).to_string(),
        None => " ".to_string(),
    }
}

fn print_record(lib: &CliLibrary, record: &CatalogRecord) {
    log::info!(
        "  {} {}  {}",
        availability_mark(lib.state().availability(record.id)),
        format!("{:>9}", record.id).if_supports_color(Stdout, |t| t.cyan()),
        record.title,
    );
}

/// Load the catalog and print a summary.
pub(crate) async fn run_load(lib: &CliLibrary, source: Option<&str>) -> Result<(), CliError> {
    load_catalog(lib, source).await?;
    let stats = lib.stats();
    log::info!("  Generation: {}", stats.generation);
    log::info!("  Records:    {}", stats.records);
    log::info!("  Queued for verification: {}", lib.queue().outstanding());
    Ok(())
}

pub(crate) async fn run_search(
    lib: &CliLibrary,
    source: Option<&str>,
    query: &QueryArgs,
    page: usize,
    page_size: usize,
) -> Result<(), CliError> {
    load_catalog(lib, source).await?;

    let mut results = lib.search(&query.text, page, page_size, query.verified);
    if query.verified {
        // Candidates for this page were just queued; give them time to settle.
        settle(lib, Duration::from_secs(query.wait)).await;
        results = lib.search(&query.text, page, page_size, true);
    }
    let total = lib.count(&query.text, query.verified);

    log::info!("");
    if results.is_empty() {
        log::info!(
            "{}",
            "No matching entries.".if_supports_color(Stdout, |t| t.dimmed()),
        );
        return Ok(());
    }
    for record in &results {
        print_record(lib, record);
    }
    log::info!("");
    log::info!(
        "Page {} ({} shown, {} {}matching)",
        page.max(1),
        results.len(),
        total,
        if query.verified { "verified " } else { "" },
    );
    Ok(())
}

pub(crate) async fn run_count(
    lib: &CliLibrary,
    source: Option<&str>,
    query: &QueryArgs,
) -> Result<(), CliError> {
    load_catalog(lib, source).await?;
    let mut total = lib.count(&query.text, query.verified);
    if query.verified {
        settle(lib, Duration::from_secs(query.wait)).await;
        total = lib.count(&query.text, true);
        log::info!(
            "{} verified ({} still queued)",
            total.if_supports_color(Stdout, |t| t.bold()),
            lib.queue().outstanding(),
        );
    } else {
        log::info!("{}", total.if_supports_color(Stdout, |t| t.bold()));
    }
    Ok(())
}

pub(crate) async fn run_info(
    lib: &CliLibrary,
    source: Option<&str>,
    id: AppId,
) -> Result<(), CliError> {
    load_catalog(lib, source).await?;
    let info = lib
        .inspect(id)
        .ok_or_else(|| CliError::not_found(id.to_string()))?;

    log::info!("");
    log::info!(
        "{} [{}]",
        info.record.title.if_supports_color(Stdout, |t| t.bold()),
        id.if_supports_color(Stdout, |t| t.cyan()),
    );
    log::info!(
        "  Category:  {}{}",
        category_label(&info.classification),
        if info.primary { "" } else { " (not listed)" },
    );
    log::info!(
        "  Assets:    {}",
        match info.availability {
            Some(true) => "present",
            Some(false) => "missing",
            None if info.queued => "queued for verification",
            None => "not checked",
        }
    );
    if let Some(req) = &info.requirements {
        log::info!("  Requirements: cached ({} chars)", req.minimum.len() + req.recommended.len());
    }
    match info.patch {
        Some(state @ PatchState::NeedsPatch { .. }) => log::info!(
            "  Patch:     {}",
            state.status_line(id).if_supports_color(Stdout, |t| t.yellow()),
        ),
        Some(state) => log::info!("  Patch:     {}", state.status_line(id)),
        None => {}
    }
    Ok(())
}
