pub(crate) mod cache;
pub(crate) mod catalog;
pub(crate) mod config;
pub(crate) mod lookup;
pub(crate) mod patch;
pub(crate) mod verify;

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use appshelf_lib::{HttpFetcher, Library, Settings};

use crate::error::CliError;

pub(crate) type CliLibrary = Library<HttpFetcher>;

pub(crate) fn open_library(settings: Settings) -> Result<CliLibrary, CliError> {
    Ok(Library::open(settings)?)
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

pub(crate) fn spinner(msg: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .expect("static pattern")
            .tick_chars("/-\\|"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(msg.into());
    pb
}

/// Load the catalog from `source` (URL or file) and start verification workers.
pub(crate) async fn load_catalog(
    lib: &CliLibrary,
    source: Option<&str>,
) -> Result<usize, CliError> {
    let pb = spinner("Loading catalog...");
    let result = match source {
        Some(path) if !is_url(path) => lib.reload_from_file(Path::new(path)),
        url => lib.reload(url).await,
    };
    pb.finish_and_clear();
    let records = result?;
    lib.start();
    log::info!(
        "{} Loaded {} entries",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        records,
    );
    Ok(records)
}

/// Let verification run for up to `wait`, showing progress.
pub(crate) async fn settle(lib: &CliLibrary, wait: Duration) {
    if wait.is_zero() || lib.queue().outstanding() == 0 {
        return;
    }
    let pb = spinner("Verifying...");
    let deadline = tokio::time::Instant::now() + wait;
    while lib.queue().outstanding() > 0 && tokio::time::Instant::now() < deadline {
        let stats = lib.stats();
        pb.set_message(format!(
            "Verifying... {} verified, {} queued",
            stats.verified,
            lib.queue().outstanding()
        ));
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    pb.finish_and_clear();
}
