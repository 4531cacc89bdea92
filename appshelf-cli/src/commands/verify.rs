use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use super::{CliLibrary, load_catalog};
use crate::error::CliError;

/// Verify every queued entry, showing a progress bar, then print totals.
pub(crate) async fn run_verify(
    lib: &CliLibrary,
    source: Option<&str>,
    wait: u64,
) -> Result<(), CliError> {
    load_catalog(lib, source).await?;

    let total = lib.queue().outstanding() as u64;
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("  {bar:40.cyan/dim} {pos}/{len} [{elapsed_precise}] {msg}")
            .expect("static pattern")
            .progress_chars("=> "),
    );

    let deadline = tokio::time::Instant::now() + Duration::from_secs(wait);
    let mut timed_out = false;
    loop {
        let outstanding = lib.queue().outstanding() as u64;
        pb.set_position(total.saturating_sub(outstanding));
        pb.set_message(format!("{} verified", lib.stats().verified));
        if outstanding == 0 {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            timed_out = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    pb.finish_and_clear();

    let stats = lib.stats();
    if timed_out {
        log::warn!(
            "{} Stopped after {}s with {} entries still queued",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            wait,
            lib.queue().outstanding(),
        );
    }
    log::info!(
        "{} Probed {} of {} entries",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        stats.probed,
        stats.records,
    );
    log::info!("  Assets present: {}", stats.available);
    log::info!("  Missing:        {}", stats.probed - stats.available);
    log::info!(
        "  Verified:       {}",
        stats.verified.if_supports_color(Stdout, |t| t.bold()),
    );
    let inconclusive = lib.queue().probes_started().saturating_sub(stats.probed as u64);
    if inconclusive > 0 {
        log::info!("  Inconclusive:   {} (will be retried next run)", inconclusive);
    }
    Ok(())
}
